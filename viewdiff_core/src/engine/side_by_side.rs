use super::text::{DiffChangeType, TextDiffEngine};
use crate::resources::{ResourceProvider, SIDE_BY_SIDE_HEADER};
use std::fmt::Write;
use viewdiff_common::Result;

/// HTML page showing both contents in two aligned columns
pub fn render(resources: &ResourceProvider, name: &str, old: &str, new: &str) -> Result<String> {
    let header = resources.get(SIDE_BY_SIDE_HEADER)?;
    let lines = TextDiffEngine::new().compare_lines(old, new);

    let mut page = String::with_capacity(header.len() + old.len() + new.len() + 256);
    page.push_str(&header);
    let _ = writeln!(page, "<table class=\"viewdiff\" title=\"{}\">", escape_html(name));
    page.push_str("<tr><th></th><th>Previous Version</th><th></th><th>Current Version</th></tr>\n");

    for line in &lines {
        let text = escape_html(&line.content);
        let (class, left, right) = match line.change_type {
            DiffChangeType::Equal => ("equal", text.as_str(), text.as_str()),
            DiffChangeType::Delete => ("removed", text.as_str(), ""),
            DiffChangeType::Insert => ("added", "", text.as_str()),
        };
        let _ = writeln!(
            page,
            "<tr class=\"{}\"><td>{}</td><td><pre>{}</pre></td><td>{}</td><td><pre>{}</pre></td></tr>",
            class,
            line_number(line.old_line),
            left,
            line_number(line.new_line),
            right
        );
    }

    page.push_str("</table>\n");
    Ok(page)
}

fn line_number(number: Option<usize>) -> String {
    number.map(|n| n.to_string()).unwrap_or_default()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_aligned_and_escaped() {
        let resources = ResourceProvider::default();
        let page = render(&resources, "view", "same\n<b>old</b>\n", "same\na & b\n").unwrap();

        assert!(page.contains("<style>"));
        assert!(page.contains(
            "<tr class=\"equal\"><td>1</td><td><pre>same</pre></td><td>1</td><td><pre>same</pre></td></tr>"
        ));
        assert!(page.contains(
            "<tr class=\"removed\"><td>2</td><td><pre>&lt;b&gt;old&lt;/b&gt;</pre></td><td></td><td><pre></pre></td></tr>"
        ));
        assert!(page.contains(
            "<tr class=\"added\"><td></td><td><pre></pre></td><td>2</td><td><pre>a &amp; b</pre></td></tr>"
        ));
    }
}
