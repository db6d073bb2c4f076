//! Compatibility transform pipeline for fetched markdown.
//!
//! Rewrites HTML-in-markdown into the strictly well-formed subset the site
//! renderer accepts, then maps allow-listed repository links to site links.
//! The rewrite sequence is fixed:
//!
//! 1. self-close void elements (`<img>`, `<br>`, `<hr>`, `<input>`)
//! 2. strip inline `style` attributes
//! 3. blank line before `</details>`
//! 4. allow-listed link rewriting
//!
//! Every step, and the sequence as a whole, is idempotent. Non-markdown
//! documents pass through untouched.

mod compat;
pub mod hooks;
mod links;

#[cfg(test)]
mod pipeline_proptests;

use tracing::{debug, instrument};

use remotedocs_shared::{
    ContentHook, Document, LinkRule, RemoteDocsError, Result, is_safe_relative_path,
};

pub use compat::{self_close_void_elements, separate_details_close, strip_inline_styles};
pub use hooks::{ReadmeAsIndex, StripHtmlComments, builtin_hooks};
pub use links::LinkRewriter;

/// The fixed compatibility pipeline, parameterized only by its link table.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    links: LinkRewriter,
}

impl Pipeline {
    pub fn new(links: LinkRewriter) -> Self {
        Self { links }
    }

    /// Build a pipeline from one source's `link_rewrites`.
    pub fn from_rules(rules: &[LinkRule]) -> Result<Self> {
        Ok(Self::new(LinkRewriter::from_rules(rules)?))
    }

    /// Run the four rewrite passes over markdown text.
    pub fn rewrite_markdown(&self, md: &str) -> String {
        let mut result = self_close_void_elements(md);
        result = strip_inline_styles(&result);
        result = separate_details_close(&result);
        result = self.links.rewrite(&result);
        result
    }

    /// Transform one fetched document.
    ///
    /// Markdown runs through the fixed passes and then the source's hook,
    /// if any. Everything else is returned unchanged.
    #[instrument(skip_all, fields(source = %doc.source_name, document = %doc.relative_path))]
    pub fn transform(&self, doc: Document, hook: Option<&dyn ContentHook>) -> Result<Document> {
        if !doc.is_markdown() {
            debug!(bytes = doc.bytes.len(), "passthrough");
            return Ok(doc);
        }

        let Document {
            source_name,
            relative_path,
            bytes,
            ..
        } = doc;

        let text = String::from_utf8(bytes).map_err(|e| {
            RemoteDocsError::transform(&relative_path, format!("markdown is not valid UTF-8: {e}"))
        })?;

        if let Some(offset) = compat::find_unterminated_void(&text) {
            let line = text[..offset].matches('\n').count() + 1;
            return Err(RemoteDocsError::transform(
                &relative_path,
                format!("unterminated void element tag at line {line}"),
            ));
        }

        let mut content = self.rewrite_markdown(&text);
        let mut filename = relative_path;

        if let Some(hook) = hook {
            if let Some(out) = hook.rewrite(&filename, &content) {
                if !is_safe_relative_path(&out.filename) {
                    return Err(RemoteDocsError::transform(
                        &filename,
                        format!(
                            "hook '{}' produced unsafe filename '{}'",
                            hook.name(),
                            out.filename
                        ),
                    ));
                }
                debug!(hook = hook.name(), filename = %out.filename, "hook rewrote document");
                filename = out.filename;
                content = out.content;
            }
        }

        debug!(
            input_len = text.len(),
            output_len = content.len(),
            changed = content != text,
            "markdown transformed"
        );

        Ok(Document::new(source_name, filename, content.into_bytes()))
    }
}
