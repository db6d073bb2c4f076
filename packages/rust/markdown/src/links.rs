//! Allow-list rewriting of repository-relative links.
//!
//! Paths that are valid inside a source repository stop being valid once the
//! document is relocated into the site tree. Only links listed in the
//! configured table are rewritten; everything else is left byte-identical.

use regex::{Captures, Regex};
use tracing::debug;

use remotedocs_shared::{LinkRule, RemoteDocsError, Result};

use crate::compat::map_prose;

/// One resolved `from -> to` mapping with its compiled matchers.
#[derive(Debug, Clone)]
struct CompiledRule {
    from: String,
    to: String,
    /// `(from#fragment)` markdown link target.
    markdown: Regex,
    /// `href="from#fragment"` / `href='from#fragment'` attribute.
    href: Regex,
}

impl CompiledRule {
    fn new(from: String, to: String) -> Result<Self> {
        let escaped = regex::escape(&from);
        let markdown = Regex::new(&format!(r"\({escaped}(#[^)\s]*)?\)"))
            .map_err(|e| RemoteDocsError::config(format!("link rule '{from}': {e}")))?;
        let href = Regex::new(&format!(
            r#"href=(?:"{escaped}(#[^"]*)?"|'{escaped}(#[^']*)?')"#
        ))
        .map_err(|e| RemoteDocsError::config(format!("link rule '{from}': {e}")))?;

        Ok(Self {
            from,
            to,
            markdown,
            href,
        })
    }

    fn apply(&self, text: &str) -> String {
        let text = self.markdown.replace_all(text, |caps: &Captures| {
            let fragment = caps.get(1).map_or("", |m| m.as_str());
            format!("({}{fragment})", self.to)
        });

        self.href
            .replace_all(&text, |caps: &Captures| match caps.get(2) {
                // Single-quoted form.
                Some(fragment) => format!("href='{}{}'", self.to, fragment.as_str()),
                None if caps[0].starts_with("href='") => format!("href='{}'", self.to),
                None => {
                    let fragment = caps.get(1).map_or("", |m| m.as_str());
                    format!("href=\"{}{fragment}\"", self.to)
                }
            })
            .into_owned()
    }

    fn matches_target(&self, target: &str) -> bool {
        self.markdown.is_match(&format!("({target})"))
    }
}

/// Rewrites the allow-listed links of a markdown document.
#[derive(Debug, Clone, Default)]
pub struct LinkRewriter {
    rules: Vec<CompiledRule>,
}

impl LinkRewriter {
    /// A rewriter that leaves every link untouched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a rewriter from configured rules.
    ///
    /// Fails if a rule is malformed or if a replacement would itself be
    /// matched by a rule (which would break idempotence).
    pub fn from_rules(rules: &[LinkRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let (from, to) = resolve(rule)?;
                CompiledRule::new(from, to)
            })
            .collect::<Result<Vec<_>>>()?;

        for rule in &compiled {
            if let Some(other) = compiled.iter().find(|o| o.matches_target(&rule.to)) {
                return Err(RemoteDocsError::config(format!(
                    "link rule '{}' rewrites to '{}', which link rule '{}' would rewrite again",
                    rule.from, rule.to, other.from
                )));
            }
        }

        debug!(rules = compiled.len(), "link rewriter ready");
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite every allow-listed link outside fenced code blocks.
    pub fn rewrite(&self, md: &str) -> String {
        if self.rules.is_empty() {
            return md.to_string();
        }
        map_prose(md, |prose| {
            self.rules
                .iter()
                .fold(prose.to_string(), |text, rule| rule.apply(&text))
        })
    }
}

/// Derive the literal `(from, to)` pair for a configured rule.
fn resolve(rule: &LinkRule) -> Result<(String, String)> {
    match rule {
        LinkRule::DocSibling { path } => {
            let stem = path.strip_suffix(".md").ok_or_else(|| {
                RemoteDocsError::config(format!("doc-sibling link '{path}' must end in .md"))
            })?;
            let name = stem.rsplit('/').next().unwrap_or(stem);
            if name.is_empty() {
                return Err(RemoteDocsError::config(format!(
                    "doc-sibling link '{path}' has no file name"
                )));
            }
            Ok((path.clone(), format!("./{name}")))
        }
        LinkRule::SubtreeIndex { path } => {
            let inner = path
                .strip_prefix("../")
                .and_then(|p| p.strip_suffix(".md"))
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    RemoteDocsError::config(format!(
                        "subtree-index link '{path}' must look like ../<dir>/README.md"
                    ))
                })?;
            Ok((path.clone(), format!("./{inner}")))
        }
        LinkRule::License {
            repository,
            branch,
            path,
        } => {
            if !repository.starts_with("https://") && !repository.starts_with("http://") {
                return Err(RemoteDocsError::config(format!(
                    "license link repository '{repository}' must be an absolute URL"
                )));
            }
            Ok((
                path.clone(),
                format!("{}/blob/{branch}/{path}", repository.trim_end_matches('/')),
            ))
        }
        LinkRule::Exact { from, to } => {
            if from.is_empty() || to.is_empty() {
                return Err(RemoteDocsError::config("exact link rule needs non-empty from and to"));
            }
            Ok((from.clone(), to.clone()))
        }
    }
}
