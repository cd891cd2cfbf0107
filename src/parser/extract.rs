use serde::Serialize;
use tracing::debug;

use super::dom::{Node, Tag};
use super::pattern::Pattern;
use super::text::reconstruct;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Title { text: String, level: u8 },
    Link { href: String, text: String },
}

impl Record {
    pub fn text(&self) -> &str {
        match self {
            Record::Title { text, .. } | Record::Link { text, .. } => text,
        }
    }
}

/// Lazy pre-order walk yielding one record per matching heading or anchor.
///
/// Headings and anchors never stop the descent, so nested matches are
/// reported after their ancestor.
pub struct Extractor<'a> {
    stack: Vec<&'a Node>,
    pattern: &'a Pattern,
}

pub fn extract<'a>(root: &'a Node, pattern: &'a Pattern) -> Extractor<'a> {
    Extractor {
        stack: vec![root],
        pattern,
    }
}

impl Extractor<'_> {
    fn visit(&self, node: &Node) -> Option<Record> {
        let Node::Element { tag, name, .. } = node else {
            return None;
        };
        let record = match *tag {
            Tag::Heading(level) => {
                let text = reconstruct(node);
                self.pattern
                    .matches(&text)
                    .then_some(Record::Title { text, level })
            }
            Tag::Anchor => {
                let href = node.attribute("href")?;
                let text = reconstruct(node);
                self.pattern.matches(&text).then(|| Record::Link {
                    href: href.to_string(),
                    text,
                })
            }
            Tag::Other => None,
        }?;
        debug!("<{}> matched: {:?}", name, record.text());
        Some(record)
    }
}

impl Iterator for Extractor<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some(node) = self.stack.pop() {
            // Reversed so the leftmost child is popped first.
            self.stack.extend(node.children().iter().rev());
            if let Some(record) = self.visit(node) {
                return Some(record);
            }
        }
        None
    }
}
