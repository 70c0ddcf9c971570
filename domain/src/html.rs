//! Pretty-printing for rendered fragments, used when HTML formatting is enabled.

const INDENT: &str = "  ";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

// Content of these elements is copied verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["pre", "script", "style", "textarea"];

enum Tag<'a> {
    Open(&'a str),
    Close,
    Standalone,
}

/// Puts every tag and text run on its own line, indented by nesting depth.
pub fn format_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    let mut depth = 0usize;
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        push_line(&mut out, &rest[..start], depth);

        let tail = &rest[start..];
        let end = if tail.starts_with("<!--") {
            tail.find("-->").map(|i| i + 3)
        } else {
            tail.find('>').map(|i| i + 1)
        };
        let Some(end) = end else {
            // Unterminated tag, keep it as text
            push_line(&mut out, tail, depth);
            rest = "";
            break;
        };

        let tag = &tail[..end];
        rest = &tail[end..];

        match classify(tag) {
            Tag::Close => {
                depth = depth.saturating_sub(1);
                push_line(&mut out, tag, depth);
            }
            Tag::Standalone => push_line(&mut out, tag, depth),
            Tag::Open(name) if RAW_TEXT_ELEMENTS.contains(&name) => {
                let raw_end = raw_text_end(rest, name);
                out.push_str(&INDENT.repeat(depth));
                out.push_str(tag);
                out.push_str(&rest[..raw_end]);
                out.push('\n');
                rest = &rest[raw_end..];
            }
            Tag::Open(_) => {
                push_line(&mut out, tag, depth);
                depth += 1;
            }
        }
    }
    push_line(&mut out, rest, depth);

    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn classify(tag: &str) -> Tag<'_> {
    if tag.starts_with("</") {
        return Tag::Close;
    }
    if tag.starts_with("<!") || tag.starts_with("<?") || tag.ends_with("/>") {
        return Tag::Standalone;
    }
    let name_len = tag[1..]
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(tag.len() - 1);
    let name = &tag[1..1 + name_len];
    if VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name)) {
        Tag::Standalone
    } else {
        Tag::Open(name)
    }
}

// Byte offset just past the closing tag of a raw text element, or the end of input.
fn raw_text_end(rest: &str, name: &str) -> usize {
    let lowered = rest.to_ascii_lowercase();
    let closing = format!("</{}", name.to_ascii_lowercase());
    match lowered.find(&closing) {
        Some(at) => lowered[at..].find('>').map(|i| at + i + 1).unwrap_or(rest.len()),
        None => rest.len(),
    }
}

fn push_line(out: &mut String, text: &str, depth: usize) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    out.push_str(&INDENT.repeat(depth));
    out.push_str(text);
    out.push('\n');
}
