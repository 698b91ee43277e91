//! Secret material loaded once at startup.

use std::fmt;
use std::path::Path;

use crate::error::GateError;

/// Environment variable overriding the submission HMAC secret.
pub const ENV_HMAC_SECRET: &str = "PAYMENT_GATE_HMAC_SECRET";
/// Environment variable overriding the webhook signing secret.
pub const ENV_WEBHOOK_SECRET: &str = "PAYMENT_GATE_WEBHOOK_SECRET";
/// Environment variable overriding the provider API key.
pub const ENV_PROVIDER_API_KEY: &str = "PAYMENT_GATE_PROVIDER_API_KEY";

/// Placeholder values that ship in sample configs and must never be deployed.
const KNOWN_DEFAULTS: &[&str] = &[
    "secret",
    "changeme",
    "change-me",
    "default-secret-key",
    "whsec_test",
];

/// Secret bytes that never appear in `Debug` or `Display` output.
#[derive(Clone)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wrap raw secret bytes, rejecting empty and placeholder values.
    pub fn new(bytes: Vec<u8>, name: &str) -> Result<Self, GateError> {
        let trimmed = trim_ascii(&bytes);
        if trimmed.is_empty() {
            return Err(GateError::Config {
                message: format!("{} is empty", name),
            });
        }

        if let Ok(text) = std::str::from_utf8(trimmed) {
            if KNOWN_DEFAULTS.iter().any(|d| d.eq_ignore_ascii_case(text)) {
                return Err(GateError::Config {
                    message: format!("{} is a well-known placeholder value", name),
                });
            }
        }

        Ok(Self(trimmed.to_vec()))
    }

    /// Borrow the secret bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Borrow the secret as UTF-8, for header-based credentials.
    pub fn expose_str(&self) -> Result<&str, GateError> {
        std::str::from_utf8(&self.0).map_err(|_| GateError::Config {
            message: "secret is not valid UTF-8".to_string(),
        })
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Load a secret, preferring the environment variable over the file.
///
/// Security: the file must not be group or world accessible.
pub fn load_secret(path: &Path, env_var: &str) -> Result<Secret, GateError> {
    if let Ok(value) = std::env::var(env_var) {
        return Secret::new(value.into_bytes(), env_var);
    }

    let metadata = std::fs::metadata(path).map_err(|e| GateError::Config {
        message: format!(
            "Failed to read secret metadata from {}: {}",
            path.display(),
            e
        ),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(GateError::Config {
                message: format!(
                    "Secret file {} has insecure permissions {:04o}, expected 0600 or 0400",
                    path.display(),
                    mode & 0o777
                ),
            });
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    let bytes = std::fs::read(path).map_err(|e| GateError::Config {
        message: format!("Failed to read secret from {}: {}", path.display(), e),
    })?;

    Secret::new(bytes, &path.display().to_string())
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
