//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and held in memory. There is no fallback
//! signing key: a missing or short `JWT_SIGNING_KEY` stops the process.

use hkdf::Hkdf;
use sha2::Sha256;
use std::env;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// HKDF label used to derive the OAuth state key from the signing key.
const STATE_KEY_INFO: &[u8] = b"goal-tracker/oauth-state/v1";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GitHub OAuth client ID (public)
    pub github_client_id: String,
    /// Redirect URI registered with the provider
    pub oauth_callback_url: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// `firestore://<project>` or `memory://`
    pub database_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// GitHub OAuth client secret
    pub github_client_secret: String,
    /// JWT signing key for bearer tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth anti-forgery state
    pub oauth_state_key: Vec<u8>,
}

/// Where principals and goals live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Firestore { project_id: String },
    Memory,
}

impl Config {
    /// Fixed configuration for tests. `from_env` never falls back to this.
    pub fn test_default() -> Self {
        let jwt_signing_key = b"test_jwt_key_32_bytes_minimum!!!".to_vec();
        Self {
            github_client_id: "test_client_id".to_string(),
            oauth_callback_url: "http://localhost:8080/auth/callback".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            database_url: "memory://".to_string(),
            port: 8080,
            github_client_secret: "test_secret".to_string(),
            oauth_state_key: derive_state_key(&jwt_signing_key),
            jwt_signing_key,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::WeakSecret {
                name: "JWT_SIGNING_KEY",
                min_len: MIN_SIGNING_KEY_LEN,
            });
        }

        let oauth_state_key = match env::var("OAUTH_STATE_KEY") {
            Ok(key) if !key.trim().is_empty() => key.trim().as_bytes().to_vec(),
            _ => derive_state_key(&jwt_signing_key),
        };

        Ok(Self {
            github_client_id: env::var("GITHUB_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GITHUB_CLIENT_ID"))?,
            oauth_callback_url: env::var("OAUTH_CALLBACK_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/auth/callback", port)),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string()),
            port,

            github_client_secret: env::var("GITHUB_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GITHUB_CLIENT_SECRET"))?,
            jwt_signing_key,
            oauth_state_key,
        })
    }

    /// Parse `database_url` into a storage target.
    pub fn database_target(&self) -> Result<DatabaseTarget, ConfigError> {
        if let Some(project_id) = self.database_url.strip_prefix("firestore://") {
            let project_id = project_id.trim_end_matches('/');
            if project_id.is_empty() {
                return Err(ConfigError::InvalidDatabaseUrl(self.database_url.clone()));
            }
            return Ok(DatabaseTarget::Firestore {
                project_id: project_id.to_string(),
            });
        }
        if self.database_url == "memory://" {
            return Ok(DatabaseTarget::Memory);
        }
        Err(ConfigError::InvalidDatabaseUrl(self.database_url.clone()))
    }

    /// Cookies are marked `Secure` whenever the callback is served over TLS.
    pub fn secure_cookies(&self) -> bool {
        self.oauth_callback_url.starts_with("https://")
    }
}

/// Derive the OAuth state key from the signing key so the two never coincide.
fn derive_state_key(signing_key: &[u8]) -> Vec<u8> {
    let hk = Hkdf::<Sha256>::new(None, signing_key);
    let mut okm = [0u8; 32];
    // 32 bytes is far below the HKDF-SHA256 output limit.
    hk.expand(STATE_KEY_INFO, &mut okm)
        .unwrap_or_else(|_| unreachable!("32-byte HKDF output is always valid"));
    okm.to_vec()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("{name} must be at least {min_len} bytes")]
    WeakSecret { name: &'static str, min_len: usize },

    #[error("Unsupported DATABASE_URL: {0}")]
    InvalidDatabaseUrl(String),
}
