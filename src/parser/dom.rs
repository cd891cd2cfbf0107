use std::borrow::Cow;
use std::collections::BTreeMap;

use encoding_rs::{Encoding, UTF_8};
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::error::ParseError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `h1`..`h6`, holding the level.
    Heading(u8),
    Anchor,
    Other,
}

impl Tag {
    fn from_name(name: &str) -> Self {
        match name {
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "a" => Tag::Anchor,
            _ => Tag::Other,
        }
    }
}

/// Owned, read-only document tree. Children are kept in document order.
#[derive(Debug)]
pub enum Node {
    Document {
        children: Vec<Node>,
    },
    Element {
        tag: Tag,
        name: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Node>,
    },
    Text {
        content: String,
    },
    /// Comments, doctypes, processing instructions.
    Other,
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { children } | Node::Element { children, .. } => children,
            Node::Text { .. } | Node::Other => &[],
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            Node::Element { attributes, .. } => attributes.get(key).map(String::as_str),
            _ => None,
        }
    }

    fn take_children(&mut self) -> Vec<Node> {
        match self {
            Node::Document { children } | Node::Element { children, .. } => {
                std::mem::take(children)
            }
            Node::Text { .. } | Node::Other => Vec::new(),
        }
    }
}

// Deep documents would overflow the stack with the default recursive drop.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.take_children());
        }
    }
}

struct ElementHead {
    tag: Tag,
    name: String,
    attributes: BTreeMap<String, String>,
}

/// Parse UTF-8 bytes into a document tree.
pub fn parse(bytes: &[u8]) -> Result<Node, ParseError> {
    parse_with_charset(bytes, None)
}

/// Parse bytes declared in `charset` (a Content-Type label such as
/// `windows-1252`). `None` means UTF-8.
///
/// The HTML5 tree builder recovers from malformed markup on its own, so the
/// only hard failures are undecodable bytes and unknown charsets.
pub fn parse_with_charset(bytes: &[u8], charset: Option<&str>) -> Result<Node, ParseError> {
    let source = decode(bytes, charset)?;
    let html = Html::parse_document(&source);
    let root = build(&html);
    debug!("Top-level nodes: {}", root.children().len());
    info!("Parsed document ({} bytes)", source.len());
    Ok(root)
}

fn decode<'b>(bytes: &'b [u8], charset: Option<&str>) -> Result<Cow<'b, str>, ParseError> {
    let encoding = match charset {
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ParseError::UnknownCharset(label.to_string()))?,
        None => UTF_8,
    };

    if encoding == UTF_8 {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        return std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| ParseError::Encoding {
                offset: e.valid_up_to(),
            });
    }

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| ParseError::Malformed(encoding.name().to_string()))
}

/// Copy the arena tree into owned nodes with an explicit stack, so nesting
/// depth is bounded by the heap rather than the call stack.
fn build(html: &Html) -> Node {
    let mut stack = vec![(None, html.tree.root().children(), Vec::new())];

    while let Some((_, pending, _)) = stack.last_mut() {
        if let Some(child) = pending.next() {
            match ElementRef::wrap(child) {
                Some(el) => stack.push((Some(head(el)), el.children(), Vec::new())),
                None => {
                    if let Some((_, _, built)) = stack.last_mut() {
                        built.push(leaf(child.value()));
                    }
                }
            }
            continue;
        }

        let Some((head, _, children)) = stack.pop() else {
            break;
        };
        let node = match head {
            Some(ElementHead {
                tag,
                name,
                attributes,
            }) => Node::Element {
                tag,
                name,
                attributes,
                children,
            },
            None => Node::Document { children },
        };
        match stack.last_mut() {
            Some((_, _, parent)) => parent.push(node),
            None => return node,
        }
    }

    Node::Document {
        children: Vec::new(),
    }
}

fn head(el: ElementRef<'_>) -> ElementHead {
    let name = el.value().name().to_string();
    let attributes = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ElementHead {
        tag: Tag::from_name(&name),
        name,
        attributes,
    }
}

fn leaf(value: &scraper::Node) -> Node {
    match value {
        scraper::Node::Text(text) => Node::Text {
            content: String::from(&**text),
        },
        _ => Node::Other,
    }
}
