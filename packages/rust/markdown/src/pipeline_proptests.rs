//! Property-based tests for the compatibility pipeline.
//!
//! Documents are generated from a vocabulary of HTML, link and fence
//! fragments so every rule gets exercised in arbitrary orderings.

use super::*;
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    "<img src=\"a.png\">",
    "<img src=\"b.png\" alt=\"B\" />",
    "<br>",
    "<br/>",
    "<BR >",
    "<hr>",
    "<input type=\"checkbox\" checked>",
    "<p style=\"color:red\">",
    "<div class=\"note\" style='margin: 0'>",
    "<img style=\"width:50%\" src=\"c.png\">",
    "</p>",
    "</div>",
    "<details>",
    "</details>",
    "<summary>More</summary>",
    "[quickstart](docs/quickstart.md#setup)",
    "[demo](../demo/README.md)",
    "[license](LICENSE)",
    "<a href=\"docs/quickstart.md\">",
    "<a href='../demo/README.md#top'>",
    "(docs/visualizations.md)",
    "```\n",
    "~~~\n",
    "\n",
    "\n\n",
    "\r\n",
    "   ",
    "plain text",
    "# Heading",
];

fn pipeline() -> Pipeline {
    Pipeline::from_rules(&[
        LinkRule::DocSibling {
            path: "docs/quickstart.md".into(),
        },
        LinkRule::SubtreeIndex {
            path: "../demo/README.md".into(),
        },
        LinkRule::License {
            repository: "https://github.com/eclipse-sdv-blueprints/ros-racer".into(),
            branch: "main".into(),
            path: "LICENSE".into(),
        },
    ])
    .unwrap()
}

fn markdown_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::sample::select(FRAGMENTS).prop_map(str::to_string),
            1 => "[a-z ]{0,12}",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    // The composed pipeline is a fixed point.
    #[test]
    fn prop_pipeline_idempotent(input in markdown_strategy()) {
        let p = pipeline();
        let once = p.rewrite_markdown(&input);
        let twice = p.rewrite_markdown(&once);
        prop_assert_eq!(twice, once);
    }

    // Each rule is a fixed point on its own.
    #[test]
    fn prop_rules_individually_idempotent(input in markdown_strategy()) {
        let void_once = self_close_void_elements(&input);
        prop_assert_eq!(self_close_void_elements(&void_once), void_once);

        let style_once = strip_inline_styles(&input);
        prop_assert_eq!(strip_inline_styles(&style_once), style_once);

        let details_once = separate_details_close(&input);
        prop_assert_eq!(separate_details_close(&details_once), details_once);

        let links = pipeline().links;
        let links_once = links.rewrite(&input);
        prop_assert_eq!(links.rewrite(&links_once), links_once);
    }

    // No style attribute survives outside fenced code.
    #[test]
    fn prop_no_style_attribute_left(input in markdown_strategy()) {
        let out = strip_inline_styles(&input);
        for seg in compat::segments(&out).into_iter().filter(|s| !s.is_code) {
            prop_assert!(!seg.text.to_ascii_lowercase().contains(" style="));
        }
    }

    // Non-markdown documents come out bit-identical.
    #[test]
    fn prop_binary_passthrough(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
        name in "[a-z]{1,8}\\.(png|svg|jpg|txt|mdx)",
    ) {
        let doc = Document::new("img", name, bytes.clone());
        let out = pipeline().transform(doc, None).unwrap();
        prop_assert_eq!(out.bytes, bytes);
    }
}
