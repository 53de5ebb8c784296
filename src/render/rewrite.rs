use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};

use crate::task::TaskEngine;
use crate::task::highlight::{HighlightKind, HighlightTask};
use crate::task::math::{MathKind, MathTask};

/// Walk the parsed document and replace every fenced code block and math
/// span with a freshly registered placeholder. The walk is synchronous; the
/// registered tasks render later, once the surrounding text exists.
///
/// Placeholders ride through serialization as raw HTML nodes: block-level
/// fragments become `HtmlBlock`, inline math becomes `HtmlInline`.
pub(crate) fn defer_fragments<'a>(
    node: &'a AstNode<'a>,
    highlight: &mut TaskEngine<HighlightKind>,
    math: &mut TaskEngine<MathKind>,
) {
    if let Some((expression, display)) = extract_math(node) {
        let placeholder = math.register(MathTask { expression, display });
        let mut data = node.data.borrow_mut();
        if display {
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: placeholder,
            });
        } else {
            data.value = NodeValue::HtmlInline(placeholder);
        }
    } else if let Some((info, literal)) = extract_code_block(node) {
        let language = info.split_whitespace().next();
        let placeholder = highlight.register(HighlightTask::new(literal, language));
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: placeholder,
        });
    }

    let mut child = node.first_child();
    while let Some(next) = child {
        defer_fragments(next, highlight, math);
        child = next.next_sibling();
    }
}

fn extract_math(node: &AstNode<'_>) -> Option<(String, bool)> {
    let data = node.data.borrow();
    if let NodeValue::Math(math) = &data.value {
        Some((math.literal.clone(), math.display_math))
    } else {
        None
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}
