use scraper::ElementRef;

/// Text of a node with every run of whitespace collapsed to one space.
pub fn extract_text(node: ElementRef) -> String {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first number in `text`, dropping currency symbols, thousands
/// separators and unit suffixes. `"$1,250,000"` -> `"1250000"`, `"2.5 ba"` -> `"2.5"`.
pub fn strip_number(text: &str) -> Option<String> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut out = String::new();
    let mut seen_dot = false;
    for c in text[start..].chars() {
        match c {
            '0'..='9' => out.push(c),
            ',' => {}
            '.' if !seen_dot => {
                seen_dot = true;
                out.push(c);
            }
            _ => break,
        }
    }
    if out.ends_with('.') {
        out.pop();
    }
    Some(out)
}

/// Link targets that never lead to another page.
pub fn is_followable_href(href: &str) -> bool {
    let href = href.trim().to_ascii_lowercase();
    !href.is_empty()
        && !["javascript:", "mailto:", "tel:", "#"]
            .iter()
            .any(|p| href.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn extract_text_joins_nested_nodes() {
        let doc = Html::parse_fragment("<div> 3 <b>bd</b>\n\n<i> 2 ba </i></div>");
        let div = doc.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(extract_text(div), "3 bd 2 ba");
    }

    #[test]
    fn strip_number_handles_formatting() {
        assert_eq!(strip_number("$1,250,000").as_deref(), Some("1250000"));
        assert_eq!(strip_number("2.5 baths").as_deref(), Some("2.5"));
        assert_eq!(strip_number("3,120 sq ft").as_deref(), Some("3120"));
        assert_eq!(strip_number("Built 1998.").as_deref(), Some("1998"));
        assert_eq!(strip_number("call agent"), None);
    }

    #[test]
    fn followable_hrefs() {
        assert!(is_followable_href("/provo-homes/page-2"));
        assert!(!is_followable_href("javascript:void(0)"));
        assert!(!is_followable_href("#"));
        assert!(!is_followable_href("  "));
    }
}
