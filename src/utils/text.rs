//! Text processing utilities.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?>.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?>.*?</style>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Count whitespace-delimited tokens.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Strip an HTML page down to its visible text.
///
/// Script and style blocks are removed entirely, remaining tags are replaced
/// by spaces, and whitespace is collapsed.
pub fn strip_html(raw_html: &str) -> String {
    let no_script = SCRIPT_RE.replace_all(raw_html, "");
    let no_style = STYLE_RE.replace_all(&no_script, "");
    let no_tags = TAG_RE.replace_all(&no_style, " ");
    normalize_whitespace(&no_tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("  a\t b\n\nc  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace("   \n\t "), "");
    }

    #[test]
    fn count_tokens_is_whitespace_delimited() {
        assert_eq!(count_tokens("one two  three\nfour"), 4);
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn strip_html_removes_scripts_and_tags() {
        let html = "<html><head><style>body { color: red; }</style>\
                    <script>alert('x');</script></head>\
                    <body><h1>Title</h1><p>Hello <b>world</b></p></body></html>";
        assert_eq!(strip_html(html), "Title Hello world");
    }

    #[test]
    fn strip_html_handles_multiline_blocks() {
        let html = "<script>\nvar x = 1;\nvar y = 2;\n</script>text";
        assert_eq!(strip_html(html), "text");
    }
}
