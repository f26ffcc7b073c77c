//! Cookie credentials for the chat hub.
//!
//! The cookie file is a browser export: a JSON array of objects with at least
//! `name` and `value`. Other fields (domain, path, expiry...) are ignored.
//! Values are kept as `SecretString` and only exposed when building the
//! `Cookie` header.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Deserialize)]
struct CookieEntry {
    name: String,
    value: String,
}

/// One named cookie value.
pub struct Cookie {
    pub name: String,
    pub value: SecretString,
}

impl std::fmt::Debug for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Read-only cookie set loaded once at startup.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read cookie file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid cookie file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl CookieJar {
    /// Load the jar from a JSON cookie export.
    ///
    /// A missing file yields an empty jar; the first streaming ask then fails
    /// authentication. An unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "cookie file not found, streaming engine will fail to authenticate");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CredentialError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let jar = Self::from_json(&content).map_err(|source| CredentialError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), count = jar.len(), "loaded cookies");
        Ok(jar)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<CookieEntry> = serde_json::from_str(json)?;
        Ok(Self {
            cookies: entries
                .into_iter()
                .map(|e| Cookie {
                    name: e.name,
                    value: SecretString::from(e.value),
                })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Cookie names, safe to log.
    pub fn names(&self) -> Vec<&str> {
        self.cookies.iter().map(|c| c.name.as_str()).collect()
    }

    /// `Cookie` header value (`name=value; name2=value2`), or `None` if empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value.expose_secret()))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
