// ---------------------------------------------------------------------------
// Credential redaction for logs
// ---------------------------------------------------------------------------

/// Redact an Authorization header value or bare token for logging.
pub fn redact_bearer_token(value: &str) -> String {
    if value.starts_with("Bearer ") {
        "Bearer [REDACTED]".to_string()
    } else {
        "[REDACTED]".to_string()
    }
}

/// Show only enough of a session token to correlate log lines: `abcd***`.
pub fn redact_session_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        return "****".to_string();
    }
    format!("{visible}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_bearer_token() {
        assert_eq!(redact_bearer_token("Bearer at_abc123"), "Bearer [REDACTED]");
        assert_eq!(redact_bearer_token("at_abc123"), "[REDACTED]");
    }

    #[test]
    fn test_redact_session_token() {
        assert_eq!(redact_session_token("sess_0123456789"), "sess***");
        assert_eq!(redact_session_token("short"), "****");
    }
}
