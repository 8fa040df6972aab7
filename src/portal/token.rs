//! Anti-forgery token extraction from portal HTML.

use html_scraper::{Html, Selector};
use std::sync::LazyLock;

/// Extract the `__RequestVerificationToken` from a portal page.
///
/// The portal moves the token around between releases, so several known
/// locations are tried in order: a hidden form input, a meta tag, and an
/// inline-script assignment. Returns `None` when no location yields a
/// non-empty value.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let input_sel = Selector::parse(r#"input[name="__RequestVerificationToken"]"#).unwrap();
    if let Some(token) = document
        .select(&input_sel)
        .find_map(|el| el.value().attr("value"))
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_string());
    }

    let meta_sel = Selector::parse(r#"meta[name="__RequestVerificationToken"]"#).unwrap();
    if let Some(token) = document
        .select(&meta_sel)
        .find_map(|el| el.value().attr("content"))
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_string());
    }

    // Patterns like `__RequestVerificationToken: "token_value"` inside scripts.
    static SCRIPT_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r#"__RequestVerificationToken["']?\s*:\s*["']([^"']+)["']"#).unwrap()
    });
    let script_sel = Selector::parse("script").unwrap();
    for script in document.select(&script_sel) {
        let text = script.text().collect::<String>();
        if let Some(caps) = SCRIPT_RE.captures(&text) {
            return Some(caps[1].to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_hidden_input() {
        let html = r#"<html><body><form>
            <input name="__RequestVerificationToken" type="hidden" value="tok-input" />
        </form></body></html>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("tok-input"));
    }

    #[test]
    fn extracts_from_meta_tag() {
        let html = r#"<html><head>
            <meta name="__RequestVerificationToken" content="tok-meta">
        </head><body></body></html>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("tok-meta"));
    }

    #[test]
    fn extracts_from_script_assignment() {
        let html = r#"<html><body><script>
            var antiForgery = { __RequestVerificationToken: "tok-script" };
        </script></body></html>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("tok-script"));
    }

    #[test]
    fn input_wins_over_meta() {
        let html = r#"<html><head>
            <meta name="__RequestVerificationToken" content="tok-meta">
        </head><body>
            <input name="__RequestVerificationToken" value="tok-input">
        </body></html>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("tok-input"));
    }

    #[test]
    fn absent_token_returns_none() {
        assert_eq!(extract_csrf_token("<html><body>login</body></html>"), None);
    }

    #[test]
    fn empty_value_is_treated_as_absent() {
        let html = r#"<input name="__RequestVerificationToken" value="">"#;
        assert_eq!(extract_csrf_token(html), None);
    }
}
