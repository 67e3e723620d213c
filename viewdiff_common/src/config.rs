use crate::ViewDiffError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "viewdiff.toml";

/// Navigation callbacks embedded in rendered views, e.g.
/// `javascript:top.showElement('id','file:/tmp/picto123/model.flexmi')`.
pub const NAVIGATION_CALLBACK_PATTERN: &str =
    r#"(?:javascript:)?(?:top\.)?show(?:Element|View)\([^)]*\)"#;

/// Generated temporary file and directory identifiers.
pub const TEMP_IDENTIFIER_PATTERN: &str = r"\b(?:picto|temp-svg|tmp)-?[0-9]{5,}\b";

/// Colours used to paint added, changed and removed graph elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintColors {
    pub added: String,
    pub changed: String,
    pub removed: String,
}

impl Default for PaintColors {
    fn default() -> Self {
        Self {
            added: "#228833".to_string(),
            changed: "#C2952D".to_string(),
            removed: "#CC3311".to_string(),
        }
    }
}

/// Structural graph diff options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDiffConfig {
    /// Copy unannotated links between already materialized nodes
    pub context_completion: bool,
    pub colors: PaintColors,
}

impl Default for GraphDiffConfig {
    fn default() -> Self {
        Self {
            context_completion: true,
            colors: PaintColors::default(),
        }
    }
}

/// Volatile substrings stripped before leaf equality checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub enabled: bool,
    /// Regular expressions whose matches are removed
    pub patterns: Vec<String>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec![
                NAVIGATION_CALLBACK_PATTERN.to_string(),
                TEMP_IDENTIFIER_PATTERN.to_string(),
            ],
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine name used when none is given explicitly (e.g. "dot-graph")
    #[serde(default)]
    pub default_engine: Option<String>,

    /// Ordered engine names for format-based resolution; empty means built-in order
    #[serde(default)]
    pub engine_order: Vec<String>,

    #[serde(default)]
    pub normalization: NormalizationConfig,

    #[serde(default)]
    pub graph: GraphDiffConfig,

    /// Directory whose files override the built-in resource templates
    #[serde(default)]
    pub resource_dir: Option<PathBuf>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, ViewDiffError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    let mut loaded = load_config_from(&path)?;
    loaded.portable = portable;
    loaded.config.portable_mode = portable;
    Ok(loaded)
}

/// Load a configuration file, falling back to defaults when it does not exist
pub fn load_config_from(path: &Path) -> Result<LoadedConfig, ViewDiffError> {
    let exists = path.exists();

    let config = if exists {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|e| ViewDiffError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        exists,
        portable: false,
    })
}

pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, ViewDiffError> {
    let loaded = load_config(prefer_portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
    }
    Ok(loaded)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ViewDiffError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| ViewDiffError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), ViewDiffError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "viewdiff", "viewdiff")
        .ok_or_else(|| ViewDiffError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
