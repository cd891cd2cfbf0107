use super::dom::Node;

/// Concatenate every descendant text node of `node`, in document order.
pub fn reconstruct(node: &Node) -> String {
    if let Node::Text { content } = node {
        return content.clone();
    }

    let mut out = String::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match current {
            Node::Text { content } => out.push_str(content),
            Node::Other => {}
            Node::Document { children } | Node::Element { children, .. } => {
                stack.extend(children.iter().rev());
            }
        }
    }
    out
}
