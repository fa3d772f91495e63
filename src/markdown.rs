//! Markdown to HTML conversion for email bodies.

use pulldown_cmark::{html, Options, Parser};

/// Render markdown source to an HTML fragment.
///
/// Tables and strikethrough are enabled; everything else is CommonMark.
pub fn to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}
