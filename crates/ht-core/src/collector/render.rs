//! HTML and CSV rendering of the collector's table.

use ht_common::StatEntry;

/// Escape a string for interpolation into HTML text or attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Summary page: the top entries as an HTML table.
pub fn render_index(top: &[StatEntry]) -> String {
    let rows: String = top
        .iter()
        .map(|entry| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(entry.direction.as_str()),
                escape_html(&entry.name),
                escape_html(&entry.value),
                entry.count
            )
        })
        .collect();

    let table = if top.is_empty() {
        "<p>No statistics have been collected yet.</p>".to_string()
    } else {
        format!(
            "<table><thead><tr><th>Type</th><th>Header Name</th><th>Header Value</th><th>Count</th></tr></thead><tbody>\n{}</tbody></table>",
            rows
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>HTTP Header Stats</title>
  <style>body{{font-family:sans-serif;margin:2em;color:#333}}table{{border-collapse:collapse}}th,td{{padding:8px 12px;text-align:left;border-bottom:1px solid #ddd}}th{{background:#007bff;color:#fff}}</style>
</head>
<body>
  <h1>HTTP Header Statistics</h1>
  <h2>Top {} Most Frequent Headers</h2>
  {}
  <p><a href="/stats">View Raw Data</a> &middot; <a href="/stats/download">Download CSV</a></p>
</body>
</html>
"#,
        top.len(),
        table
    )
}

/// RFC4180-style CSV: quoted text fields with doubled inner quotes.
pub fn render_csv(entries: &[StatEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push("Type,Header Name,Header Value,Count".to_string());
    for entry in entries {
        lines.push(format!(
            "{},{},{},{}",
            csv_field(entry.direction.as_str()),
            csv_field(&entry.name),
            csv_field(&entry.value),
            entry.count
        ));
    }
    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_common::Direction;

    fn entry(name: &str, value: &str, count: u64) -> StatEntry {
        StatEntry {
            name: name.to_string(),
            value: value.to_string(),
            direction: Direction::Request,
            count,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("it's"), "it&#039;s");
    }

    #[test]
    fn test_render_index_escapes_values() {
        let html = render_index(&[entry("X-Evil", "<img src=x>", 1)]);
        assert!(html.contains("&lt;img src=x&gt;"));
        assert!(!html.contains("<img src=x>"));
    }

    #[test]
    fn test_render_index_empty_table() {
        let html = render_index(&[]);
        assert!(html.contains("No statistics have been collected yet."));
    }

    #[test]
    fn test_render_csv_header_and_quoting() {
        let csv = render_csv(&[entry("Accept", "text/html, \"quoted\"", 3)]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Type,Header Name,Header Value,Count"));
        assert_eq!(
            lines.next(),
            Some(r#""request","Accept","text/html, ""quoted""",3"#)
        );
    }
}
