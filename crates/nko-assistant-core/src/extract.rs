//! Parsing of completion-model replies into filters.
//!
//! Completion models do not reliably follow output instructions, so both
//! parsers accept loose input: the city parser maps the `null` sentinel to
//! "no city", and the categories parser falls back to a comma-separated
//! list when the reply is not JSON.

/// Parses the reply to the city-extraction prompt.
///
/// Returns `None` for an empty reply or the literal `null`
/// (case-insensitive); any other reply is accepted verbatim after trimming.
pub fn parse_city_reply(reply: &str) -> Option<String> {
    let city = reply.trim();
    if city.is_empty() || city.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(city.to_string())
    }
}

/// Parses the reply to the categories-extraction prompt.
///
/// A JSON array yields its string items, a JSON string yields itself, and
/// a JSON object yields its first array-valued field. Other JSON values
/// yield nothing. Only a reply that is not JSON at all is split on commas.
/// Items are trimmed and empty items are dropped in every path.
pub fn parse_categories_reply(reply: &str) -> Vec<String> {
    use serde_json::Value;

    let text = strip_code_fence(reply.trim());

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => array_items(items),
        Ok(Value::String(s)) => clean_items(std::iter::once(s)),
        Ok(Value::Object(fields)) => fields
            .into_iter()
            .find_map(|(_, value)| match value {
                Value::Array(items) => Some(array_items(items)),
                _ => None,
            })
            .unwrap_or_default(),
        Ok(_) => Vec::new(),
        Err(_) => split_comma_list(text),
    }
}

fn array_items(items: Vec<serde_json::Value>) -> Vec<String> {
    clean_items(items.into_iter().filter_map(|item| match item {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }))
}

fn clean_items(items: impl Iterator<Item = String>) -> Vec<String> {
    items
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_comma_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````).
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the language tag on the opening line, if any.
    match body.find('\n') {
        Some(pos) => body[pos + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_null_sentinel() {
        assert_eq!(parse_city_reply("null"), None);
        assert_eq!(parse_city_reply("  NULL \n"), None);
        assert_eq!(parse_city_reply("Null"), None);
        assert_eq!(parse_city_reply(""), None);
    }

    #[test]
    fn test_city_verbatim() {
        assert_eq!(parse_city_reply(" Казань\n").as_deref(), Some("Казань"));
        assert_eq!(
            parse_city_reply("Нижний Новгород").as_deref(),
            Some("Нижний Новгород")
        );
    }

    #[test]
    fn test_categories_json_array() {
        assert_eq!(
            parse_categories_reply(r#"["животные", "экология"]"#),
            vec!["животные", "экология"]
        );
        assert!(parse_categories_reply("[]").is_empty());
    }

    #[test]
    fn test_categories_comma_fallback() {
        assert_eq!(
            parse_categories_reply("едa, помощь животным"),
            vec!["едa", "помощь животным"]
        );
        assert_eq!(parse_categories_reply(" дети ,, , спорт "), vec!["дети", "спорт"]);
    }

    #[test]
    fn test_categories_non_array_json() {
        assert_eq!(parse_categories_reply(r#"" животные ""#), vec!["животные"]);
        assert!(parse_categories_reply(r#""""#).is_empty());
        assert_eq!(
            parse_categories_reply(r#"{"categories": ["животные", "дети"]}"#),
            vec!["животные", "дети"]
        );
        assert!(parse_categories_reply(r#"{"category": "дети"}"#).is_empty());
        assert!(parse_categories_reply("null").is_empty());
        assert!(parse_categories_reply("42").is_empty());
        assert!(parse_categories_reply("true").is_empty());
    }

    #[test]
    fn test_categories_code_fence() {
        assert_eq!(
            parse_categories_reply("```json\n[\"животные\"]\n```"),
            vec!["животные"]
        );
        assert_eq!(parse_categories_reply("```[\"дети\"]```"), vec!["дети"]);
    }

    #[test]
    fn test_categories_array_items_trimmed() {
        assert_eq!(
            parse_categories_reply(r#"[" спорт ", "", null]"#),
            vec!["спорт"]
        );
    }
}
