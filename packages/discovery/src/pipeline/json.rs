//! Lenient JSON parsing for model answers.
//!
//! Models wrap JSON in markdown fences or add a sentence before it even in
//! JSON mode. Parsing tries the raw text, then the fenced body, then the
//! outermost `{...}` or `[...]` span.

use serde::de::DeserializeOwned;

/// Parse a model answer as `T`.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> serde_json::Result<T> {
    serde_json::from_str(response)
        .or_else(|_| serde_json::from_str(strip_code_fences(response)))
        .or_else(|err| match outermost_json(response) {
            Some(span) => serde_json::from_str(span),
            None => Err(err),
        })
}

/// Remove a surrounding ```` ```json ```` fence.
pub fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn outermost_json(response: &str) -> Option<&str> {
    let start = response.find(['{', '['])?;
    let close = if response[start..].starts_with('{') { '}' } else { ']' };
    let end = response.rfind(close)?;
    (end > start).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        valid: bool,
    }

    #[test]
    fn test_parses_plain_json() {
        let answer: Answer = parse_json_response(r#"{"valid": true}"#).unwrap();
        assert!(answer.valid);
    }

    #[test]
    fn test_parses_fenced_json() {
        let answer: Answer = parse_json_response("```json\n{\"valid\": false}\n```").unwrap();
        assert!(!answer.valid);

        let terms: Vec<String> = parse_json_response("```\n[\"a\", \"b\"]\n```").unwrap();
        assert_eq!(terms, vec!["a", "b"]);
    }

    #[test]
    fn test_parses_json_after_preamble() {
        let answer: Answer =
            parse_json_response("Here is my verdict:\n{\"valid\": true}\nThanks.").unwrap();
        assert!(answer.valid);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_json_response::<Answer>("no json here").is_err());
    }
}
