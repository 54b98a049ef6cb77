//! Flattening markup trees back to display text.

use crate::ast::MarkupNode;

/// Concatenated literal content of a tree, with chat references shown in
/// their source syntax and custom emoji as `:name:`.
#[must_use]
pub fn plain_text(nodes: &[MarkupNode]) -> String {
    plain_text_with(nodes, &|_| None)
}

/// Like [`plain_text`], but `label` may supply the text for any node
/// (typically resolved mention names or formatted timestamps).
#[must_use]
pub fn plain_text_with(nodes: &[MarkupNode], label: &dyn Fn(&MarkupNode) -> Option<String>) -> String {
    let mut out = String::new();
    write_nodes(nodes, label, &mut out);
    out
}

fn write_nodes(
    nodes: &[MarkupNode],
    label: &dyn Fn(&MarkupNode) -> Option<String>,
    out: &mut String,
) {
    for node in nodes {
        if let Some(text) = label(node) {
            out.push_str(&text);
            continue;
        }
        match node {
            MarkupNode::Text(t) | MarkupNode::InlineCode(t) | MarkupNode::UnicodeEmoji(t) => {
                out.push_str(t);
            },
            MarkupNode::CodeBlock { content, .. } => out.push_str(content),
            MarkupNode::Mention(m) => out.push_str(&m.raw()),
            MarkupNode::CustomEmoji { name, .. } => {
                out.push(':');
                out.push_str(name);
                out.push(':');
            },
            MarkupNode::Timestamp { epoch, style } => {
                out.push_str(&format!("<t:{epoch}:{}>", style.flag()));
            },
            MarkupNode::SlashCommand { name, .. } => {
                out.push('/');
                out.push_str(name);
            },
            other => {
                if let Some(children) = other.children() {
                    write_nodes(children, label, out);
                }
            },
        }
    }
}
