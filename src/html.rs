//! Small forgiving HTML reader that builds a [`Dom`] from page markup.
//!
//! It understands what server-rendered templates actually emit: nested
//! elements, void and self-closing tags, quoted/unquoted/bare attributes and
//! comments. `<script>` and `<style>` bodies are kept as raw text and never
//! run.

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

pub fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut stack = vec![dom.root()];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->")
                .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<!") {
            // Doctype and other declarations carry nothing we model.
            let end = find_subslice(bytes, i, b">")
                .ok_or_else(|| Error::HtmlParse("unclosed declaration".into()))?;
            i = end + 1;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| *b == b'/' || b.is_ascii_alphabetic())
        {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;
                close_open_element(&dom, &mut stack, &tag);
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            let parent = current_parent(&stack)?;
            let node = dom.create_element(parent, &tag, attrs);

            if is_raw_text_tag(&tag) {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        dom.create_text(node, body);
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            dom.create_text(current_parent(&stack)?, text);
        }
    }

    Ok(dom)
}

fn current_parent(stack: &[NodeId]) -> Result<NodeId> {
    stack
        .last()
        .copied()
        .ok_or_else(|| Error::HtmlParse("missing parent element".into()))
}

/// Pops up to and including the nearest open element named `tag`. Stray end
/// tags with no matching open element are ignored.
fn close_open_element(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    let Some(pos) = stack
        .iter()
        .skip(1)
        .rposition(|node| dom.tag_name(*node).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    else {
        return;
    };
    stack.truncate(pos + 1);
}

type StartTag = (String, Vec<(String, String)>, bool, usize);

fn parse_start_tag(html: &str, at: usize) -> Result<StartTag> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}>")));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        if name.is_empty() {
            return Err(Error::HtmlParse(format!("invalid attribute name in <{tag}>")));
        }

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
            .to_string();
        *i += 1;
        return Ok(value);
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && *i + 1 < bytes.len() && bytes[*i + 1] == b'>')
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
        .to_string();
    Ok(value)
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'')
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window == needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut needle = Vec::with_capacity(tag.len() + 2);
    needle.extend_from_slice(b"</");
    needle.extend(tag.iter().map(|b| b.to_ascii_lowercase()));

    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(&needle))
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_tree_with_ids_and_values() -> Result<()> {
        let dom = parse_html(
            r#"<!DOCTYPE html>
            <nav>
              <button id="profileBtn" type=button><img src="a.png"> Me</button>
              <div id="profileMenu" class="hidden absolute"><a href="/logout/">Log out</a></div>
            </nav>
            <input type="hidden" name="score" id="score-input" value="4">
            "#,
        )?;

        let button = dom.by_id("profileBtn").expect("button");
        let menu = dom.by_id("profileMenu").expect("menu");
        let input = dom.by_id("score-input").expect("input");

        assert_eq!(dom.tag_name(button), Some("button"));
        assert_eq!(dom.attr(button, "type").as_deref(), Some("button"));
        assert!(dom.text_content(button).is_some_and(|text| text.contains("Me")));
        assert!(dom.class_contains(menu, "hidden")?);
        assert_eq!(dom.value(input)?, "4");
        assert_eq!(dom.parent(button), dom.parent(menu));
        Ok(())
    }

    #[test]
    fn svg_children_and_self_closing_paths_nest_correctly() -> Result<()> {
        let dom = parse_html(
            r#"<div id="stars">
                <svg data-value="1" class="w-6"><path d="M0 0"/></svg>
                <svg data-value="2" class="w-6"><path d="M0 0"/></svg>
            </div>"#,
        )?;

        let container = dom.by_id("stars").expect("container");
        let stars = dom.query_selector_all_from(container, "svg")?;
        assert_eq!(stars.len(), 2);
        assert_eq!(dom.attr(stars[1], "data-value").as_deref(), Some("2"));
        let paths = dom.query_selector_all_from(stars[0], "path")?;
        assert_eq!(paths.len(), 1);
        Ok(())
    }

    #[test]
    fn script_bodies_are_raw_text() -> Result<()> {
        let dom = parse_html(
            "<script>if (a < b) { document.getElementById('x'); }</script><p id='after'></p>",
        )?;
        let script = dom.query_selector("script")?.expect("script");
        assert!(dom.text_content(script).is_some_and(|text| text.contains("a < b")));
        assert!(dom.by_id("after").is_some());
        Ok(())
    }

    #[test]
    fn stray_end_tags_and_bare_attributes_are_tolerated() -> Result<()> {
        let dom = parse_html("<div id='a'></span><input id='b' disabled></div>")?;
        let input = dom.by_id("b").expect("input");
        assert_eq!(dom.attr(input, "disabled").as_deref(), Some(""));
        assert_eq!(dom.parent(input), dom.by_id("a"));
        Ok(())
    }

    #[test]
    fn less_than_in_text_is_kept_as_text() -> Result<()> {
        let dom = parse_html("<p id='p'>1 < 2</p>")?;
        let p = dom.by_id("p").expect("p");
        assert_eq!(dom.text_content(p).as_deref(), Some("1 < 2"));
        Ok(())
    }

    #[test]
    fn malformed_markup_is_reported() {
        for html in [
            "<!-- open",
            "<div class='x>",
            "<div",
            "<script>never closed",
        ] {
            assert!(
                matches!(parse_html(html), Err(Error::HtmlParse(_))),
                "expected parse error for {html:?}"
            );
        }
    }
}
