//! Text extraction by content kind.

use scraper::{ElementRef, Html};

use super::ContentKind;

/// Elements whose content never reaches the text output.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that start and end on their own line.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tr", "td", "th", "title", "ul",
];

/// Converts a payload to plain text.
///
/// HTML is flattened with block elements on their own lines, JSON is
/// pretty-printed (or passed through when it does not parse), XML and text
/// are decoded as UTF-8 with replacement. Binary yields an empty string.
pub fn to_text(raw: &[u8], kind: ContentKind) -> String {
    match kind {
        ContentKind::Html => html_to_text(&String::from_utf8_lossy(raw)),
        ContentKind::Json => match serde_json::from_slice::<serde_json::Value>(raw) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_default(),
            Err(_) => String::from_utf8_lossy(raw).into_owned(),
        },
        ContentKind::Xml | ContentKind::Text => String::from_utf8_lossy(raw).into_owned(),
        ContentKind::Binary => String::new(),
    }
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut flat = String::new();
    flatten(document.root_element(), &mut flat);

    flat.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}

fn flatten(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            push_collapsed(out, text);
            continue;
        }

        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();

        if SKIPPED.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }

        let block = BLOCKS.contains(&name);
        if block {
            out.push('\n');
        }
        flatten(child, out);
        if block {
            out.push('\n');
        }
    }
}

/// Appends `text` with whitespace runs collapsed to a single space.
fn push_collapsed(out: &mut String, text: &str) {
    let mut pending_space = text.starts_with(char::is_whitespace);
    for word in text.split_whitespace() {
        if pending_space && !out.is_empty() && !out.ends_with(['\n', ' ']) {
            out.push(' ');
        }
        out.push_str(word);
        pending_space = true;
    }
    if text.ends_with(char::is_whitespace) && !out.is_empty() && !out.ends_with(['\n', ' ']) {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_blocks_on_separate_lines() {
        let html = "<html><head><title>Page</title></head><body><h1>Hello</h1><p>First   paragraph\n with  spaces.</p><div>Second <b>bold</b> block</div></body></html>";
        assert_eq!(
            to_text(html.as_bytes(), ContentKind::Html),
            "Page\nHello\nFirst paragraph with spaces.\nSecond bold block"
        );
    }

    #[test]
    fn test_html_strips_script_and_style() {
        let html = "<body><style>p { color: red; }</style><p>Visible</p><script>alert('x')</script><noscript>nojs</noscript></body>";
        assert_eq!(to_text(html.as_bytes(), ContentKind::Html), "Visible");
    }

    #[test]
    fn test_html_line_breaks() {
        let html = "<p>one<br>two</p><ul><li>a</li><li>b</li></ul>";
        assert_eq!(to_text(html.as_bytes(), ContentKind::Html), "one\ntwo\na\nb");
    }

    #[test]
    fn test_html_long_lines_are_not_wrapped() {
        let words = vec!["word"; 200].join(" ");
        let html = format!("<p>{words}</p>");
        assert_eq!(to_text(html.as_bytes(), ContentKind::Html), words);
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let text = to_text(br#"{"a":1,"b":[true]}"#, ContentKind::Json);
        assert_eq!(text, "{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}");
    }

    #[test]
    fn test_invalid_json_passes_through() {
        assert_eq!(to_text(b"{not json", ContentKind::Json), "{not json");
    }

    #[test]
    fn test_text_and_xml_decode_lossy() {
        assert_eq!(to_text(b"plain", ContentKind::Text), "plain");
        assert_eq!(to_text(b"<a>1</a>", ContentKind::Xml), "<a>1</a>");
        assert_eq!(to_text(&[b'o', b'k', 0xff], ContentKind::Text), "ok\u{fffd}");
    }

    #[test]
    fn test_binary_is_empty() {
        assert!(to_text(&[0, 1, 2, 3], ContentKind::Binary).is_empty());
    }
}
