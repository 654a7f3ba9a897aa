//! Namespace-agnostic XML extraction for ONVIF SOAP responses
//!
//! Cameras disagree on namespace prefixes (`tt:`, `trt:`, `ns2:`, none), so
//! elements are matched on their local name only.

/// Locate the first opening tag whose local name is `tag`
///
/// Returns (index of `<`, index just past `>`, qualified name, self-closing)
fn find_open_tag<'a>(xml: &'a str, tag: &str) -> Option<(usize, usize, &'a str, bool)> {
    let mut offset = 0;

    while let Some(rel) = xml[offset..].find('<') {
        let start = offset + rel;
        let rest = &xml[start + 1..];
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        let local = name.rsplit(':').next().unwrap_or(name);

        if !name.is_empty() && local == tag {
            let close = rest.find('>')?;
            let self_closing = rest[..close].ends_with('/');
            return Some((start, start + 1 + close + 1, name, self_closing));
        }

        offset = start + 1;
    }

    None
}

/// Escape the five predefined entities for element text
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Inner content of the first element named `tag` (up to its matching close tag)
pub fn section<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let (_, content_start, name, self_closing) = find_open_tag(xml, tag)?;
    if self_closing {
        return None;
    }

    let close_tag = format!("</{}>", name);
    let content_end = xml[content_start..].find(close_tag.as_str())?;
    Some(&xml[content_start..content_start + content_end])
}

/// Trimmed, unescaped text of the first element named `tag`
pub fn element_text(xml: &str, tag: &str) -> Option<String> {
    let (_, content_start, _, self_closing) = find_open_tag(xml, tag)?;
    if self_closing {
        return None;
    }

    let content_end = xml[content_start..].find("</")?;
    let value = xml[content_start..content_start + content_end].trim();
    if value.is_empty() {
        None
    } else {
        Some(unescape(value))
    }
}

/// Value of attribute `attr` on the first element named `tag`
pub fn element_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let (start, end, _, _) = find_open_tag(xml, tag)?;
    let tag_text = &xml[start..end];
    let pattern = format!("{}=", attr);

    let mut offset = 0;
    while let Some(rel) = tag_text[offset..].find(pattern.as_str()) {
        let at = offset + rel;
        let preceded_by_space = tag_text[..at]
            .chars()
            .last()
            .map(|c| c.is_whitespace())
            .unwrap_or(false);

        if preceded_by_space {
            let after = &tag_text[at + pattern.len()..];
            let quote = after.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let value_end = after[1..].find(quote)?;
            return Some(unescape(&after[1..1 + value_end]));
        }

        offset = at + pattern.len();
    }

    None
}

/// Fault reason if the document is a SOAP fault
pub fn soap_fault(xml: &str) -> Option<String> {
    let fault = section(xml, "Fault")?;
    Some(
        element_text(fault, "Text")
            .or_else(|| element_text(fault, "faultstring"))
            .or_else(|| element_text(fault, "Value"))
            .unwrap_or_else(|| "SOAP fault".to_string()),
    )
}
