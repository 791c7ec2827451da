use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::{User, UserRole};

/// Bearer sessions expire after a day.
pub const SESSION_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Authenticated account, injected into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        }
    }
}

struct SessionEntry {
    user: AuthUser,
    expires: Instant,
}

/// In-memory token store. Only SHA-256 hashes of tokens are kept.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], SessionEntry>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_lifetime(SESSION_LIFETIME)
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            lifetime,
        }
    }

    /// Start a session and return the bearer token to hand to the client.
    pub fn create(&mut self, user: AuthUser) -> String {
        self.cleanup();
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                user,
                expires: Instant::now() + self.lifetime,
            },
        );
        token
    }

    /// Resolve a token to its user, or `None` if unknown or expired.
    pub fn validate(&self, token: &str) -> Option<AuthUser> {
        self.sessions
            .get(&hash_token(token))
            .filter(|entry| Instant::now() < entry.expires)
            .map(|entry| entry.user.clone())
    }

    /// Returns `true` if the token was live.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| now < entry.expires);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(token.as_bytes()).into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
