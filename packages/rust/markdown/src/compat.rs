//! HTML-in-markdown compatibility rules.
//!
//! Each rule is a pure `&str -> String` function and a fixed point of
//! itself. Fenced code blocks are never touched: the renderer does not parse
//! HTML inside them.

use std::sync::LazyLock;

use regex::{Captures, Regex};

// ---------------------------------------------------------------------------
// Fenced code segmentation
// ---------------------------------------------------------------------------

/// A contiguous slice of a document, either prose or fenced code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    /// Byte offset of `text` in the whole document.
    pub start: usize,
    pub text: &'a str,
    pub is_code: bool,
}

/// Opening fence marker of a line (``` or ~~~), if any.
fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

/// Split `md` into prose and fenced-code segments. Concatenating the
/// segments' text yields `md` again.
pub(crate) fn segments(md: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut seg_start = 0;
    let mut offset = 0;
    let mut open_fence: Option<char> = None;

    for line in md.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        match (open_fence, fence_marker(line)) {
            (None, Some(marker)) => {
                if line_start > seg_start {
                    out.push(Segment {
                        start: seg_start,
                        text: &md[seg_start..line_start],
                        is_code: false,
                    });
                }
                seg_start = line_start;
                open_fence = Some(marker);
            }
            (Some(open), Some(marker)) if open == marker => {
                out.push(Segment {
                    start: seg_start,
                    text: &md[seg_start..offset],
                    is_code: true,
                });
                seg_start = offset;
                open_fence = None;
            }
            _ => {}
        }
    }

    if seg_start < md.len() {
        out.push(Segment {
            start: seg_start,
            text: &md[seg_start..],
            is_code: open_fence.is_some(),
        });
    }

    out
}

/// Apply `f` to every prose segment, copying code segments verbatim.
pub(crate) fn map_prose(md: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(md.len());
    for seg in segments(md) {
        if seg.is_code {
            out.push_str(seg.text);
        } else {
            out.push_str(&f(seg.text));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Rule 1: Self-close void elements
// ---------------------------------------------------------------------------

static VOID_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(img|br|hr|input)(\s[^>]*)?>").expect("valid regex")
});

static UNTERMINATED_VOID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:img|br|hr|input)(?:\s[^>]*)?\z").expect("valid regex")
});

/// Rewrite `<img ...>`, `<br>`, `<hr>`, `<input ...>` to their self-closing
/// form. Tags already ending in `/>` are left as they are.
pub fn self_close_void_elements(md: &str) -> String {
    map_prose(md, |prose| {
        VOID_TAG_RE
            .replace_all(prose, |caps: &Captures| {
                let whole = &caps[0];
                if whole.ends_with("/>") {
                    return whole.to_string();
                }
                let attrs = caps.get(2).map_or("", |m| m.as_str()).trim_end();
                format!("<{}{attrs} />", &caps[1])
            })
            .into_owned()
    })
}

/// Byte offset of a void tag that is opened but never closed with `>`.
pub(crate) fn find_unterminated_void(md: &str) -> Option<usize> {
    segments(md)
        .into_iter()
        .filter(|seg| !seg.is_code)
        .find_map(|seg| UNTERMINATED_VOID_RE.find(seg.text).map(|m| seg.start + m.start()))
}

// ---------------------------------------------------------------------------
// Rule 2: Strip inline style attributes
// ---------------------------------------------------------------------------

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][^<>]*>").expect("valid regex"));

static STYLE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Unquoted values stop before `/` so `<br style=x/>` keeps its self-closing slash.
    Regex::new(r#"(?i)\s+style\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>/]+)"#).expect("valid regex")
});

/// Remove `style="..."` attributes from every HTML tag. The renderer wants
/// style objects, not strings, and docs don't need the styling.
pub fn strip_inline_styles(md: &str) -> String {
    map_prose(md, |prose| {
        TAG_RE
            .replace_all(prose, |caps: &Captures| {
                STYLE_ATTR_RE.replace_all(&caps[0], "").into_owned()
            })
            .into_owned()
    })
}

// ---------------------------------------------------------------------------
// Rule 3: Blank line before </details>
// ---------------------------------------------------------------------------

/// Insert an empty line before a `</details>` line that directly follows a
/// non-blank line, so raw HTML is separated from the markdown above it.
pub fn separate_details_close(md: &str) -> String {
    let mut out = String::with_capacity(md.len() + 16);
    let mut open_fence: Option<char> = None;
    let mut prev: Option<&str> = None;

    for line in md.split_inclusive('\n') {
        let marker = fence_marker(line);
        let in_code = match (open_fence, marker) {
            (None, Some(m)) => {
                open_fence = Some(m);
                true
            }
            (Some(open), Some(m)) if open == m => {
                open_fence = None;
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        };

        if !in_code && line.trim_start().starts_with("</details>") {
            if let Some(p) = prev.filter(|p| !p.trim().is_empty()) {
                out.push_str(if p.ends_with("\r\n") { "\r\n" } else { "\n" });
            }
        }

        out.push_str(line);
        prev = Some(line);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Segmentation ---------------------------------------------------------

    #[test]
    fn segments_roundtrip_and_classify() {
        let md = "intro\n```html\n<br>\n```\nafter\n~~~\ncode\n";
        let segs = segments(md);
        let joined: String = segs.iter().map(|s| s.text).collect();
        assert_eq!(joined, md);

        let kinds: Vec<bool> = segs.iter().map(|s| s.is_code).collect();
        assert_eq!(kinds, vec![false, true, false, true]);
        assert_eq!(segs[1].text, "```html\n<br>\n```\n");
        assert_eq!(segs[2].start, "intro\n```html\n<br>\n```\n".len());
    }

    #[test]
    fn tilde_fence_not_closed_by_backticks() {
        let md = "~~~\n```\n<br>\n~~~\n<br>";
        let segs = segments(md);
        assert!(segs[0].is_code);
        assert_eq!(segs[0].text, "~~~\n```\n<br>\n~~~\n");
        assert!(!segs[1].is_code);
    }

    // Rule 1 ---------------------------------------------------------------

    #[test]
    fn void_img_gets_self_closed() {
        assert_eq!(
            self_close_void_elements(r#"<img src="a.png">"#),
            r#"<img src="a.png" />"#
        );
    }

    #[test]
    fn void_all_kinds_and_case() {
        let input = r#"a<br>b<HR><input type="checkbox" checked><Img SRC="x.png" alt="x">"#;
        let expected =
            r#"a<br />b<HR /><input type="checkbox" checked /><Img SRC="x.png" alt="x" />"#;
        assert_eq!(self_close_void_elements(input), expected);
    }

    #[test]
    fn void_already_closed_untouched() {
        let input = r#"<br/> <br /> <img src="a.png"/> <img src="b.png" />"#;
        assert_eq!(self_close_void_elements(input), input);
    }

    #[test]
    fn void_trailing_space_trimmed() {
        assert_eq!(self_close_void_elements("<br >"), "<br />");
        assert_eq!(
            self_close_void_elements("<img\n  src=\"a.png\"\n>"),
            "<img\n  src=\"a.png\" />"
        );
    }

    #[test]
    fn void_similar_names_untouched() {
        let input = "<image href=\"x\"> <brand> <hra>";
        assert_eq!(self_close_void_elements(input), input);
    }

    #[test]
    fn void_inside_code_fence_untouched() {
        let input = "<br>\n```html\n<br>\n```\n";
        assert_eq!(self_close_void_elements(input), "<br />\n```html\n<br>\n```\n");
    }

    #[test]
    fn void_idempotent() {
        let once = self_close_void_elements(r#"<img src="a.png"><br><hr >"#);
        assert_eq!(self_close_void_elements(&once), once);
    }

    #[test]
    fn unterminated_void_detected() {
        assert_eq!(find_unterminated_void("text <img src=\"a.png"), Some(5));
        assert_eq!(find_unterminated_void("<br"), Some(0));
        assert_eq!(find_unterminated_void("<img src=\"a.png\">"), None);
        assert_eq!(find_unterminated_void("```\n<img src=\"a\n"), None);
    }

    // Rule 2 ---------------------------------------------------------------

    #[test]
    fn style_stripped_from_paragraph() {
        assert_eq!(strip_inline_styles(r#"<p style="color:red">x</p>"#), "<p>x</p>");
    }

    #[test]
    fn style_stripped_other_attributes_kept() {
        let input = r#"<img src="a.png" STYLE='width: 50%' alt="A" />"#;
        assert_eq!(strip_inline_styles(input), r#"<img src="a.png" alt="A" />"#);

        let input = r#"<div class="note" style="" data-style="keep">"#;
        assert_eq!(
            strip_inline_styles(input),
            r#"<div class="note" data-style="keep">"#
        );
    }

    #[test]
    fn style_unquoted_keeps_self_closing_slash() {
        assert_eq!(strip_inline_styles("<br style=clear/>"), "<br/>");
    }

    #[test]
    fn style_in_prose_text_untouched() {
        let input = r#"Set style="color:red" on the element."#;
        assert_eq!(strip_inline_styles(input), input);
    }

    #[test]
    fn style_inside_code_fence_untouched() {
        let input = "```html\n<p style=\"color:red\">x</p>\n```\n";
        assert_eq!(strip_inline_styles(input), input);
    }

    // Rule 3 ---------------------------------------------------------------

    #[test]
    fn details_close_gets_blank_line() {
        assert_eq!(separate_details_close("line\n</details>"), "line\n\n</details>");
    }

    #[test]
    fn details_close_already_separated() {
        let input = "line\n\n</details>";
        assert_eq!(separate_details_close(input), input);
    }

    #[test]
    fn details_close_at_start_untouched() {
        assert_eq!(separate_details_close("</details>\n"), "</details>\n");
    }

    #[test]
    fn details_close_after_code_fence() {
        let input = "<details>\n\n```sh\nmake\n```\n</details>\n";
        assert_eq!(
            separate_details_close(input),
            "<details>\n\n```sh\nmake\n```\n\n</details>\n"
        );
    }

    #[test]
    fn details_close_inside_code_fence_untouched() {
        let input = "```html\n<details>\nx\n</details>\n```\n";
        assert_eq!(separate_details_close(input), input);
    }

    #[test]
    fn details_close_preserves_crlf() {
        assert_eq!(
            separate_details_close("line\r\n</details>\r\n"),
            "line\r\n\r\n</details>\r\n"
        );
    }
}
