//! Math typesetting task renderer.

use async_trait::async_trait;
use katex::{OptsBuilder, OutputType};
use serde::Serialize;

use crate::cache::{Cache, keys};
use crate::error::RenderError;
use crate::options::MathOptions;

use super::{RenderKind, render_one};

/// One deferred typesetting request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MathTask {
    pub(crate) expression: String,
    pub(crate) display: bool,
}

pub(crate) struct MathKind {
    options: MathOptions,
}

impl MathKind {
    pub(crate) fn new(options: MathOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl RenderKind for MathKind {
    type Payload = MathTask;

    const KIND: &'static str = "math";

    fn cache_seed(&self) -> serde_json::Value {
        serde_json::to_value(&self.options).expect("math options serialize to JSON")
    }

    async fn render(&self, payload: &MathTask) -> Result<String, RenderError> {
        render_math_html(&payload.expression, payload.display, &self.options)
    }

    fn fallback(&self, payload: &MathTask) -> String {
        html_escape::encode_text(&payload.expression).into_owned()
    }

    fn post_process(&self, payload: &MathTask, html: String) -> String {
        if payload.display {
            format!("<div data-role=\"math-block\" data-math-style=\"display\">{html}</div>")
        } else {
            format!("<span data-role=\"math-inline\" data-math-style=\"inline\">{html}</span>")
        }
    }
}

/// Render a KaTeX expression to an HTML fragment, inline or display mode.
fn render_math_html(
    expression: &str,
    display: bool,
    options: &MathOptions,
) -> Result<String, RenderError> {
    let mut builder = OptsBuilder::default();
    builder.display_mode(display);
    builder.output_type(OutputType::Html);
    if !options.macros.is_empty() {
        let macros: std::collections::HashMap<String, String> =
            options.macros.clone().into_iter().collect();
        builder.macros(macros);
    }

    let opts = builder
        .build()
        .map_err(|err| RenderError::math(format!("failed to build KaTeX options: {err}")))?;

    katex::render_with_opts(expression, opts)
        .map_err(|err| RenderError::math(format!("KaTeX rendering failed: {err}")))
}

/// One-shot typesetting outside a document render, sharing cache entries
/// with batched rendering. Failures degrade to the escaped expression; this
/// never errors.
pub async fn typeset(
    expression: &str,
    display: bool,
    cache: Option<&dyn Cache>,
    options: &MathOptions,
) -> String {
    let kind = MathKind::new(options.clone());
    let task = MathTask {
        expression: expression.to_string(),
        display,
    };
    let key = keys::task_key(MathKind::KIND, &kind.cache_seed(), &task);
    render_one(&kind, cache, &key, &task).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_expression_typesets_with_katex() {
        let html = render_math_html("a^2 + b^2", false, &MathOptions::default()).unwrap();
        assert!(html.contains("katex"));
    }

    #[test]
    fn invalid_expression_reports_an_error() {
        let result = render_math_html("\\frac{", true, &MathOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn macros_are_passed_through() {
        let mut options = MathOptions::default();
        options
            .macros
            .insert("\\RR".to_string(), "\\mathbb{R}".to_string());

        let html = render_math_html("\\RR", false, &options).unwrap();
        assert!(html.contains("katex"));
    }

    #[tokio::test]
    async fn typeset_falls_back_to_escaped_expression() {
        let html = typeset("\\frac{", false, None, &MathOptions::default()).await;
        assert_eq!(
            html,
            "<span data-role=\"math-inline\" data-math-style=\"inline\">\\frac{</span>"
        );
    }

    #[test]
    fn display_and_inline_containers_differ() {
        let kind = MathKind::new(MathOptions::default());
        let block = MathTask {
            expression: "x".to_string(),
            display: true,
        };
        let inline = MathTask {
            expression: "x".to_string(),
            display: false,
        };

        assert!(kind.post_process(&block, "x".to_string()).starts_with("<div"));
        assert!(kind.post_process(&inline, "x".to_string()).starts_with("<span"));
    }
}
