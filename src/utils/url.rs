//! Endpoint URL construction for OpenAI-compatible APIs.

/// Strip trailing slashes so endpoints can be appended with a single `/`.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join `base_url` and `endpoint` with exactly one slash between them.
///
/// ```
/// use streamark::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434/v1/", "/chat/completions"),
///     "http://localhost:11434/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalize_base_url(base_url), endpoint)
}

/// Reject base URLs that reqwest would fail on later with a less helpful
/// message.
pub fn validate_base_url(base_url: &str) -> Result<(), String> {
    let normalized = normalize_base_url(base_url);
    let Some((scheme, rest)) = normalized.split_once("://") else {
        return Err(format!("base URL {base_url:?} has no scheme"));
    };
    if !matches!(scheme, "http" | "https") {
        return Err(format!("base URL {base_url:?} must use http or https"));
    }
    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("base URL {base_url:?} has no host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_slash() {
        for (base, endpoint) in [
            ("https://api.example.com/v1", "chat/completions"),
            ("https://api.example.com/v1/", "chat/completions"),
            ("https://api.example.com/v1///", "/chat/completions"),
            (" https://api.example.com/v1 ", "chat/completions"),
        ] {
            assert_eq!(
                construct_api_url(base, endpoint),
                "https://api.example.com/v1/chat/completions"
            );
        }
    }

    #[test]
    fn normalizes_degenerate_input() {
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn validation_requires_http_scheme_and_host() {
        assert!(validate_base_url("https://api.example.com/v1").is_ok());
        assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
        assert!(validate_base_url("api.example.com").is_err());
        assert!(validate_base_url("ftp://example.com").is_err());
        assert!(validate_base_url("https://").is_err());
    }
}
