//! Placeholder rendering.
//! Placeholders are `{{ expression }}` blocks evaluated by MiniJinja's
//! expression compiler in an otherwise empty environment. Only the variables
//! of [`RenderContext`] and the filters registered here are available, and the
//! output of an expression is never scanned again. A `}}` inside a quoted
//! string literal does not close the placeholder.
use std::collections::BTreeSet;

use cruet::Inflector;
use log::{debug, warn};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::options::NormalizedOptions;
use crate::source::TemplateNode;

/// Names a placeholder expression may reference.
pub const VARIABLES: [&str; 14] = [
    "name",
    "class_name",
    "dash_name",
    "camel_name",
    "snake_name",
    "constant_name",
    "path",
    "database",
    "messaging",
    "auth",
    "crud",
    "operations",
    "skip_tests",
    "apply_migrations",
];

/// Filters a placeholder expression may apply.
pub const FILTERS: [&str; 9] = [
    "classify",
    "dasherize",
    "camelize",
    "underscore",
    "constantize",
    "pluralize",
    "lower",
    "upper",
    "join",
];

/// The variables placeholders are evaluated against.
///
/// Run-mode switches (`dry_run`, `force`) and the `flat` layout flag are not
/// exposed: a preview renders exactly what a commit writes, and a flat layout
/// only moves files.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    name: String,
    class_name: String,
    dash_name: String,
    camel_name: String,
    snake_name: String,
    constant_name: String,
    path: String,
    database: String,
    messaging: String,
    auth: String,
    crud: String,
    operations: Vec<String>,
    skip_tests: bool,
    apply_migrations: bool,
}

impl RenderContext {
    pub fn new(options: &NormalizedOptions) -> Self {
        RenderContext {
            name: options.name.clone(),
            class_name: options.names.class.clone(),
            dash_name: options.names.dash.clone(),
            camel_name: options.names.camel.clone(),
            snake_name: options.names.snake.clone(),
            constant_name: options.names.constant.clone(),
            path: options.path.clone(),
            database: options.database.to_string(),
            messaging: options.messaging.to_string(),
            auth: options.auth.to_string(),
            crud: options.crud.to_string(),
            operations: options.operations.iter().map(|op| op.to_string()).collect(),
            skip_tests: options.skip_tests,
            apply_migrations: options.apply_migrations,
        }
    }
}

/// Trait for placeholder rendering engines.
pub trait TemplateRenderer {
    /// Renders every placeholder in `template`.
    ///
    /// # Arguments
    /// * `origin` - Template path reported in errors
    /// * `template` - Text containing placeholders
    /// * `context` - Values placeholders resolve against
    fn render(&self, origin: &str, template: &str, context: &RenderContext) -> Result<String>;
}

/// MiniJinja expression based renderer.
pub struct ExpressionRenderer {
    env: Environment<'static>,
}

impl ExpressionRenderer {
    pub fn new() -> Self {
        let mut env = Environment::empty();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("classify", |value: String| value.to_pascal_case());
        env.add_filter("dasherize", |value: String| value.to_kebab_case());
        env.add_filter("camelize", |value: String| value.to_camel_case());
        env.add_filter("underscore", |value: String| value.to_snake_case());
        env.add_filter("constantize", |value: String| value.to_screaming_snake_case());
        env.add_filter("pluralize", |value: String| value.to_plural());
        env.add_filter("lower", |value: String| value.to_lowercase());
        env.add_filter("upper", |value: String| value.to_uppercase());
        env.add_filter("join", |values: Vec<String>, separator: Option<String>| {
            values.join(separator.as_deref().unwrap_or(""))
        });
        Self { env }
    }

    fn evaluate(&self, origin: &str, expression: &str, context: &RenderContext) -> Result<String> {
        let source = expression.trim();
        if source.is_empty() {
            return Err(Error::template_render(origin, "empty placeholder"));
        }

        let compiled = self.env.compile_expression(source).map_err(|e| {
            Error::template_render(origin, format!("cannot parse '{source}': {e}"))
        })?;

        let unknown: BTreeSet<String> = compiled
            .undeclared_variables(false)
            .into_iter()
            .filter(|variable| !VARIABLES.contains(&variable.as_str()))
            .collect();
        if let Some(variable) = unknown.into_iter().next() {
            return Err(Error::template_render(
                origin,
                format!("unknown variable '{variable}' in '{source}'"),
            ));
        }

        let value = compiled
            .eval(context)
            .map_err(|e| Error::template_render(origin, format!("cannot evaluate '{source}': {e}")))?;
        Ok(value.to_string())
    }
}

impl Default for ExpressionRenderer {
    fn default() -> Self {
        ExpressionRenderer::new()
    }
}

impl TemplateRenderer for ExpressionRenderer {
    fn render(&self, origin: &str, template: &str, context: &RenderContext) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut cursor = 0;

        while let Some(offset) = template[cursor..].find("{{") {
            let open = cursor + offset;
            let start = open + 2;
            let close = find_close(template, start)
                .ok_or_else(|| Error::template_render(origin, "unterminated placeholder"))?;

            output.push_str(&template[cursor..open]);
            output.push_str(&self.evaluate(origin, &template[start..close], context)?);
            cursor = close + 2;
        }

        output.push_str(&template[cursor..]);
        Ok(output)
    }
}

/// Byte offset of the `}}` closing a placeholder whose body starts at `from`,
/// skipping over single or double quoted string literals.
fn find_close(template: &str, from: usize) -> Option<usize> {
    let bytes = template.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let byte = bytes[i];
        match quote {
            Some(_) if byte == b'\\' => i += 1,
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'}' && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

/// A selected template with its path and content rendered but not yet relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    /// Path of the source template node.
    pub template_path: String,
    /// Rendered, still template-relative path.
    pub path: String,
    pub content: String,
}

/// Output of the render stage: what rendered and what failed.
#[derive(Debug, Default)]
pub struct RenderOutcome {
    pub rendered: Vec<RenderedTemplate>,
    pub failures: Vec<Error>,
}

/// Renders the path and content of every selected node.
///
/// A failing node is recorded and does not stop the others; callers decide
/// whether any failure aborts the run.
pub fn render_nodes(
    renderer: &dyn TemplateRenderer,
    nodes: &[&TemplateNode],
    options: &NormalizedOptions,
) -> RenderOutcome {
    let context = RenderContext::new(options);
    let mut outcome = RenderOutcome::default();

    for node in nodes {
        let Some(raw_content) = node.raw_content() else {
            continue;
        };
        let rendered = renderer
            .render(&node.path, &node.path, &context)
            .and_then(|path| {
                let content = renderer.render(&node.path, raw_content, &context)?;
                Ok(RenderedTemplate {
                    template_path: node.path.clone(),
                    path,
                    content,
                })
            });

        match rendered {
            Ok(template) => {
                debug!("Rendered {} -> {}", template.template_path, template.path);
                outcome.rendered.push(template);
            }
            Err(e) => {
                warn!("{e}");
                outcome.failures.push(e);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_close() {
        assert_eq!(find_close("{{ name }}", 2), Some(8));
        assert_eq!(find_close(r#"{{ "}}" }}"#, 2), Some(8));
        assert_eq!(find_close(r#"{{ '\'}}' }}"#, 2), Some(10));
        assert_eq!(find_close("{{ name", 2), None);
        assert_eq!(find_close(r#"{{ "open }}"#, 2), None);
    }
}
