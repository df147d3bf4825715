use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::{ExposeSecret, SecretString};

/// Characters left as-is in a query component, matching browser
/// `encodeURIComponent`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Bearer token with secrecy protection (zeroized on drop, redacted in Debug).
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

impl From<String> for AuthToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for AuthToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Build the socket URL, appending `token=<encoded>` when a non-empty token
/// is present. Without a token the base URL is used unchanged and the server
/// decides whether to accept.
pub fn connection_url(base: &str, token: Option<&AuthToken>) -> String {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            let encoded = utf8_percent_encode(token.expose(), QUERY_COMPONENT);
            format!("{base}{separator}token={encoded}")
        }
        None => base.to_string(),
    }
}

/// Strip the query string so URLs can be logged without token material.
pub fn redact_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let token = AuthToken::from("super-secret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(token.expose(), "super-secret");
    }

    #[test]
    fn url_without_token() {
        assert_eq!(connection_url("ws://host/ws", None), "ws://host/ws");
    }

    #[test]
    fn url_with_empty_token_is_unchanged() {
        let token = AuthToken::from("");
        assert_eq!(connection_url("ws://host/ws", Some(&token)), "ws://host/ws");
    }

    #[test]
    fn url_with_token_is_encoded() {
        let token = AuthToken::from("a b+c/d=");
        assert_eq!(
            connection_url("ws://host/ws", Some(&token)),
            "ws://host/ws?token=a%20b%2Bc%2Fd%3D"
        );
    }

    #[test]
    fn url_keeps_unreserved_characters() {
        let token = AuthToken::from("eyJ.abc-_~");
        assert_eq!(
            connection_url("wss://h/ws", Some(&token)),
            "wss://h/ws?token=eyJ.abc-_~"
        );
    }

    #[test]
    fn url_appends_to_existing_query() {
        let token = AuthToken::from("t");
        assert_eq!(
            connection_url("ws://h/ws?v=2", Some(&token)),
            "ws://h/ws?v=2&token=t"
        );
    }

    #[test]
    fn redact_strips_query() {
        assert_eq!(redact_url("ws://h/ws?token=secret"), "ws://h/ws");
        assert_eq!(redact_url("ws://h/ws"), "ws://h/ws");
    }
}
