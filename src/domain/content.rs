//! Sanitization of editor-produced rich text before it reaches a page.

use std::{collections::HashSet, sync::OnceLock};

use ammonia::Builder as AmmoniaBuilder;

static POST_SANITIZER: OnceLock<AmmoniaBuilder<'static>> = OnceLock::new();

/// Clean stored post HTML against the editor's allow-list.
///
/// Structure produced by the composer (paragraphs, headings, emphasis, lists,
/// links, quotes and code) passes through unchanged; scripts, event handlers
/// and unknown elements are removed.
pub fn sanitize_post_html(html: &str) -> String {
    POST_SANITIZER
        .get_or_init(build_post_sanitizer)
        .clean(html)
        .to_string()
}

fn build_post_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "hr",
        "i",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "strike",
        "strong",
        "b",
        "u",
        "ul",
    ]);
    builder.tags(tags);
    builder.generic_attributes(HashSet::new());
    builder.add_tag_attributes("a", &["href", "target"]);
    builder.add_tag_attributes("ol", &["start"]);
    builder.link_rel(Some("noopener noreferrer nofollow"));
    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));

    builder
}
