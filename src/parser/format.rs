use super::extract::Record;

/// How record fields are embedded in the rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escaping {
    /// Fields copied as-is. Only safe when the sink does not interpret markup.
    #[default]
    Verbatim,
    /// `& < > " '` replaced by entity references in every field.
    Html,
}

pub fn render(record: &Record, escaping: Escaping) -> String {
    match record {
        Record::Title { text, .. } => field(text, escaping),
        Record::Link { href, text } => clickable_link(href, text, escaping),
    }
}

pub fn clickable_link(href: &str, text: &str, escaping: Escaping) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        field(href, escaping),
        field(text, escaping)
    )
}

/// The full output line for a record, e.g. `Title found: Hello`.
pub fn report_line(record: &Record, escaping: Escaping) -> String {
    let label = match record {
        Record::Title { .. } => "Title found",
        Record::Link { .. } => "Link found",
    };
    format!("{}: {}", label, render(record, escaping))
}

fn field(value: &str, escaping: Escaping) -> String {
    match escaping {
        Escaping::Verbatim => value.to_string(),
        Escaping::Html => escape_html(value),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
