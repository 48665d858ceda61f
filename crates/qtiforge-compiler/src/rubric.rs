//! Rubric block rendering and stylesheet scoping.
//!
//! Rubric blocks are extracted from the test body at compile time and
//! rendered into standalone template fragments. Any stylesheet a rubric
//! references is rewritten so its selectors only apply under the rubric's
//! root element, then stored next to the fragment. The authored base-path
//! token is replaced with an expression the delivery runtime evaluates at
//! request time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use qtiforge_core::model::RubricBlock;

use crate::storage::StorageArea;

/// The artifact-relative base-path token authors may use in rubric markup.
pub const ARTIFACT_BASE_TOKEN: &str = "qti://artifact-base/";

/// The runtime-evaluated expression the token is replaced with.
pub const RUNTIME_BASE_EXPRESSION: &str = "{{artifact_base}}";

/// A rubric block rendered to disk.
#[derive(Debug, Clone)]
pub struct RenderedRubric {
    /// Private-area-relative path of the rendered fragment.
    pub href: PathBuf,
    /// Private-area-relative paths of the scoped stylesheets.
    pub stylesheet_paths: Vec<PathBuf>,
}

/// Renders rubric blocks into self-contained template fragments.
#[derive(Debug)]
pub struct RubricRenderer {
    base_token: String,
    runtime_expression: String,
}

impl Default for RubricRenderer {
    fn default() -> Self {
        Self {
            base_token: ARTIFACT_BASE_TOKEN.to_string(),
            runtime_expression: RUNTIME_BASE_EXPRESSION.to_string(),
        }
    }
}

impl RubricRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one rubric block into `{identifier}.tpl` in the private
    /// area: stylesheet links prepended, markup wrapped in the scoping
    /// root element, base-path token replaced.
    ///
    /// Referenced stylesheets must already be present in the private area;
    /// they are scoped and overwritten in place.
    pub fn render(
        &self,
        rubric: &RubricBlock,
        private: &StorageArea,
    ) -> Result<RenderedRubric> {
        tracing::debug!(rubric = %rubric.identifier, "rendering rubric block");

        let mut markup = String::new();
        let mut stylesheet_paths = Vec::with_capacity(rubric.stylesheets.len());

        for href in &rubric.stylesheets {
            let relative = Path::new(href);
            let css = private.read_to_string(relative).with_context(|| {
                format!("stylesheet '{href}' of rubric '{}' is missing", rubric.identifier)
            })?;
            private.write(relative, &scope_css(&css, &rubric.identifier))?;
            stylesheet_paths.push(relative.to_path_buf());

            markup.push_str(&format!(
                "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}{}\"/>\n",
                self.runtime_expression, href
            ));
        }

        markup.push_str(&format!(
            "<div class=\"qti-rubric-block\" id=\"{}\" data-view=\"{}\">\n",
            rubric.identifier, rubric.view
        ));
        markup.push_str(rubric.content.trim());
        markup.push_str("\n</div>\n");

        let markup = markup.replace(&self.base_token, &self.runtime_expression);

        let href = PathBuf::from(format!("{}.tpl", rubric.identifier));
        private.write(&href, &markup)?;

        Ok(RenderedRubric {
            href,
            stylesheet_paths,
        })
    }
}

/// Rewrite a stylesheet so every selector only applies under `#scope_id`.
///
/// `@media` blocks are scoped recursively; other at-rules pass through
/// untouched.
pub fn scope_css(css: &str, scope_id: &str) -> String {
    let mut out = String::new();
    scope_block(&strip_comments(css), scope_id, &mut out);
    out
}

fn scope_block(css: &str, scope_id: &str, out: &mut String) {
    let mut rest = css;
    while let Some(open) = rest.find('{') {
        let head = &rest[..open];

        // Brace-less at-statements (@import, @charset) pass through.
        let selector = match head.rfind(';') {
            Some(p) => {
                let statements = head[..=p].trim();
                if !statements.is_empty() {
                    out.push_str(statements);
                    out.push('\n');
                }
                head[p + 1..].trim()
            }
            None => head.trim(),
        };

        let body_end = matching_brace(rest, open);
        let body = &rest[open + 1..body_end];

        if selector.starts_with("@media") {
            out.push_str(selector);
            out.push_str(" {\n");
            scope_block(body, scope_id, out);
            out.push_str("}\n");
        } else if selector.starts_with('@') {
            // @font-face, @keyframes and friends keep their bodies as-is.
            out.push_str(selector);
            out.push_str(" {");
            out.push_str(body);
            out.push_str("}\n");
        } else if !selector.is_empty() {
            let scoped = selector
                .split(',')
                .map(|s| format!("#{scope_id} {}", s.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&scoped);
            out.push_str(" {");
            out.push_str(body);
            out.push_str("}\n");
        }

        rest = rest[body_end..].strip_prefix('}').unwrap_or(&rest[body_end..]);
    }

    let tail = rest.trim();
    if !tail.is_empty() {
        out.push_str(tail);
        out.push('\n');
    }
}

/// Index of the brace closing the block opened at `open`.
fn matching_brace(s: &str, open: usize) -> usize {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    s.len()
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
