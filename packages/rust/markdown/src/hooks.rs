//! Built-in content hooks, selectable per source with `hook = "<name>"`.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use remotedocs_shared::{ContentHook, HookOutput, HookRegistry};

use crate::compat::map_prose;

/// Registry holding every built-in hook.
pub fn builtin_hooks() -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.register(Arc::new(StripHtmlComments));
    registry.register(Arc::new(ReadmeAsIndex));
    registry
}

/// Removes `<!-- ... -->` comments, which the renderer rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripHtmlComments;

impl ContentHook for StripHtmlComments {
    fn rewrite(&self, filename: &str, content: &str) -> Option<HookOutput> {
        static COMMENT_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

        let stripped = map_prose(content, |prose| COMMENT_RE.replace_all(prose, "").into_owned());
        (stripped != content).then(|| HookOutput {
            filename: filename.to_string(),
            content: stripped,
        })
    }

    fn name(&self) -> &str {
        "strip-html-comments"
    }
}

/// Renames `README.md` (any case) to `index.md` in the same directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadmeAsIndex;

impl ContentHook for ReadmeAsIndex {
    fn rewrite(&self, filename: &str, content: &str) -> Option<HookOutput> {
        let (dir, file) = match filename.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, filename),
        };
        if !file.eq_ignore_ascii_case("readme.md") {
            return None;
        }

        let renamed = match dir {
            Some(dir) => format!("{dir}/index.md"),
            None => "index.md".to_string(),
        };
        Some(HookOutput {
            filename: renamed,
            content: content.to_string(),
        })
    }

    fn name(&self) -> &str {
        "readme-as-index"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_registered_by_name() {
        let hooks = builtin_hooks();
        assert_eq!(hooks.names(), vec!["readme-as-index", "strip-html-comments"]);
        assert!(hooks.get("strip-html-comments").is_some());
    }

    #[test]
    fn strips_comments_outside_code() {
        let input = "a <!-- hidden --> b\n<!--\nmulti\n-->\n```html\n<!-- kept -->\n```\n";
        let out = StripHtmlComments.rewrite("README.md", input).unwrap();
        assert_eq!(out.filename, "README.md");
        assert_eq!(out.content, "a  b\n\n```html\n<!-- kept -->\n```\n");
    }

    #[test]
    fn no_comments_means_unchanged() {
        assert!(StripHtmlComments.rewrite("a.md", "# Title\n").is_none());
    }

    #[test]
    fn readme_renamed_to_index() {
        let out = ReadmeAsIndex.rewrite("Readme.md", "# Hi\n").unwrap();
        assert_eq!(out.filename, "index.md");
        assert_eq!(out.content, "# Hi\n");

        let nested = ReadmeAsIndex.rewrite("demo/README.md", "x").unwrap();
        assert_eq!(nested.filename, "demo/index.md");

        assert!(ReadmeAsIndex.rewrite("quickstart.md", "x").is_none());
    }
}
