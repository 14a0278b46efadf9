//! Markdown → HTML transform.
//!
//! CommonMark plus GFM tables; fenced code blocks are part of CommonMark.
//! The parser never fails: constructs it does not recognise come out as
//! literal text, so no validation has to precede this stage.

use pulldown_cmark::{html, Options, Parser};
use tracing::debug;

/// Convert Markdown to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, parser);

    debug!("Markdown {} bytes → HTML {} bytes", markdown.len(), out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_and_paragraph() {
        let html = markdown_to_html("# Title\n\nHello\n");
        assert_eq!(html, "<h1>Title</h1>\n<p>Hello</p>\n");
    }

    #[test]
    fn tables_enabled() {
        let html = markdown_to_html("| A | B |\n| --- | --- |\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "got: {html}");
        assert!(html.contains("<th>A</th>"), "got: {html}");
        assert!(html.contains("<td>2</td>"), "got: {html}");
    }

    #[test]
    fn fenced_code_keeps_language() {
        let html = markdown_to_html("```rust\nfn main() {}\n```\n");
        assert!(
            html.contains("<pre><code class=\"language-rust\">fn main() {}"),
            "got: {html}"
        );
    }

    #[test]
    fn code_is_escaped() {
        let html = markdown_to_html("```\n<b>not bold</b>\n```\n");
        assert!(html.contains("&lt;b&gt;not bold&lt;/b&gt;"), "got: {html}");
    }

    #[test]
    fn horizontal_rule() {
        let html = markdown_to_html("a\n\n---\n\nb\n");
        assert_eq!(html, "<p>a</p>\n<hr />\n<p>b</p>\n");
    }

    #[test]
    fn malformed_input_degrades() {
        // Unclosed fence, dangling table pipe, stray emphasis.
        let html = markdown_to_html("```python\nprint(1)\n| a |\n**bold\n");
        assert!(html.contains("<pre><code"), "got: {html}");
        let html = markdown_to_html("| only a pipe\n*unclosed");
        assert!(html.contains("*unclosed"), "got: {html}");
    }

    #[test]
    fn empty_input() {
        assert_eq!(markdown_to_html(""), "");
        assert_eq!(markdown_to_html("\n"), "");
    }
}
