use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tracing::warn;

use super::config::{AuthConfig, ViewerTokenConfig};
use super::redact::redact_bearer_token;
use super::types::ViewerId;

/// Bcrypt cost factor for hashing admin tokens.
const BCRYPT_COST: u32 = 10;

/// Authentication provider for viewer sessions and admin API requests.
///
/// Session issuing lives in the external auth service; this provider only
/// maps presented bearer tokens to viewer ids and checks admin tokens.
/// All mutable state sits behind locks so it can be shared as `Arc<AuthProvider>`
/// and rotated on SIGHUP.
#[derive(Debug)]
pub struct AuthProvider {
    /// Valid admin bearer tokens stored as bcrypt hashes.
    admin_token_hashes: Mutex<Vec<String>>,
    /// Session token → viewer.
    viewer_sessions: RwLock<HashMap<String, ViewerId>>,
}

impl AuthProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            admin_token_hashes: Mutex::new(hash_tokens(&config.admin_bearer_tokens)),
            viewer_sessions: RwLock::new(session_map(&config.viewer_tokens)),
        }
    }

    /// Resolve a viewer session token to the viewer it was issued for.
    pub fn resolve_viewer(&self, token: &str) -> Option<ViewerId> {
        let sessions = self
            .viewer_sessions
            .read()
            .unwrap_or_else(|e| e.into_inner());
        sessions.get(token).copied()
    }

    /// Bind a session token to a viewer at runtime.
    pub fn insert_viewer_session(&self, token: impl Into<String>, viewer_id: ViewerId) {
        let mut sessions = self
            .viewer_sessions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        sessions.insert(token.into(), viewer_id);
    }

    /// Drop every session bound to a viewer. Returns how many were removed.
    pub fn revoke_viewer_sessions(&self, viewer_id: ViewerId) -> usize {
        let mut sessions = self
            .viewer_sessions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, id| *id != viewer_id);
        before - sessions.len()
    }

    /// Validate an admin bearer token against stored bcrypt hashes.
    /// If no tokens are configured, all requests are accepted (open mode).
    pub fn validate_admin_token(&self, token: &str) -> bool {
        let hashes = self
            .admin_token_hashes
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if hashes.is_empty() {
            return true;
        }

        hashes
            .iter()
            .any(|h| bcrypt::verify(token, h).unwrap_or(false))
    }

    /// Check an admin bearer token taken from an Authorization header.
    ///
    /// - Missing → 401
    /// - Not in valid set → 403
    /// - Valid → proceed
    pub fn check_admin_token(&self, token: Option<&str>) -> TokenStatus {
        match token {
            None if self.is_open_mode() => TokenStatus::Valid,
            None => TokenStatus::Missing,
            Some(t) => {
                if self.validate_admin_token(t) {
                    TokenStatus::Valid
                } else {
                    warn!(
                        authorization = %redact_bearer_token(t),
                        "admin token rejected"
                    );
                    TokenStatus::Forbidden
                }
            }
        }
    }

    /// Replace admin tokens at runtime. Accepts plaintext and stores hashes.
    pub fn update_admin_tokens(&self, tokens: Vec<String>) {
        let hashes = hash_tokens(&tokens);
        let mut current = self
            .admin_token_hashes
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *current = hashes;
    }

    /// Replace the viewer session table at runtime.
    pub fn update_viewer_tokens(&self, tokens: &[ViewerTokenConfig]) {
        let sessions = session_map(tokens);
        let mut current = self
            .viewer_sessions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *current = sessions;
    }

    /// True when no admin tokens are configured.
    pub fn is_open_mode(&self) -> bool {
        self.admin_token_hashes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

/// Result of checking a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Missing,
    Forbidden,
}

fn hash_tokens(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter_map(|t| bcrypt::hash(t, BCRYPT_COST).ok())
        .collect()
}

fn session_map(tokens: &[ViewerTokenConfig]) -> HashMap<String, ViewerId> {
    tokens
        .iter()
        .filter_map(|entry| match entry.viewer_id.parse::<ViewerId>() {
            Ok(id) => Some((entry.token.clone(), id)),
            Err(e) => {
                warn!(
                    viewer_id = %entry.viewer_id,
                    error = %e,
                    "ignoring viewer token with malformed viewer id"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(admin: &[&str], viewers: &[(&str, &str)]) -> AuthConfig {
        AuthConfig {
            admin_bearer_tokens: admin.iter().map(|s| s.to_string()).collect(),
            viewer_tokens: viewers
                .iter()
                .map(|(t, v)| ViewerTokenConfig {
                    token: t.to_string(),
                    viewer_id: v.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_open_mode_accepts_everything() {
        let auth = AuthProvider::new(&config(&[], &[]));
        assert!(auth.is_open_mode());
        assert_eq!(auth.check_admin_token(None), TokenStatus::Valid);
        assert_eq!(auth.check_admin_token(Some("x")), TokenStatus::Valid);
    }

    #[test]
    fn test_admin_token_statuses() {
        let auth = AuthProvider::new(&config(&["at_secret"], &[]));
        assert!(!auth.is_open_mode());
        assert_eq!(auth.check_admin_token(None), TokenStatus::Missing);
        assert_eq!(auth.check_admin_token(Some("nope")), TokenStatus::Forbidden);
        assert_eq!(auth.check_admin_token(Some("at_secret")), TokenStatus::Valid);
    }

    #[test]
    fn test_viewer_sessions() {
        let viewer = ViewerId::new();
        let id = viewer.to_string();
        let auth = AuthProvider::new(&config(&[], &[("tok", &id), ("bad", "not-a-uuid")]));
        assert_eq!(auth.resolve_viewer("tok"), Some(viewer));
        assert_eq!(auth.resolve_viewer("bad"), None);
        assert_eq!(auth.resolve_viewer("other"), None);

        auth.update_viewer_tokens(&[]);
        assert_eq!(auth.resolve_viewer("tok"), None);

        auth.insert_viewer_session("fresh", viewer);
        assert_eq!(auth.resolve_viewer("fresh"), Some(viewer));
    }

    #[test]
    fn test_revoke_viewer_sessions() {
        let (a, b) = (ViewerId::new(), ViewerId::new());
        let auth = AuthProvider::new(&config(&[], &[]));
        auth.insert_viewer_session("a1", a);
        auth.insert_viewer_session("a2", a);
        auth.insert_viewer_session("b1", b);

        assert_eq!(auth.revoke_viewer_sessions(a), 2);
        assert_eq!(auth.resolve_viewer("a1"), None);
        assert_eq!(auth.resolve_viewer("b1"), Some(b));
        assert_eq!(auth.revoke_viewer_sessions(a), 0);
    }
}
