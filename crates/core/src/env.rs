//! Environment-style value expansion and secret redaction.
//!
//! Settings such as repository paths and the access token may reference
//! environment variables (`$VAR`, `${VAR}`) or the home directory (`~`).
//! [`expand_value`] resolves them; [`Redactor`] undoes the expansion of the
//! token in any text that is about to be logged or shown.

use percent_encoding::utf8_percent_encode;
use tracing::warn;

use crate::git::remote_url::USERINFO;

/// Stand-in for a secret that was configured literally.
pub const MASK: &str = "********";

/// Expand `$VAR`, `${VAR}` and a leading `~` in `raw`.
///
/// Returns `None` when the value is blank, references an undefined
/// variable, or expands to an empty string.
pub fn expand_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match shellexpand::full(trimmed) {
        Ok(expanded) if !expanded.trim().is_empty() => Some(expanded.into_owned()),
        Ok(_) => {
            warn!("value expanded to an empty string");
            None
        }
        Err(e) => {
            warn!(var = %e.var_name, "referenced environment variable is not set");
            None
        }
    }
}

/// Replaces an expanded secret with its configured (unexpanded) text.
///
/// A token written literally in the settings has no placeholder of its own
/// and is replaced by [`MASK`] instead.
///
/// Git echoes remote URLs in its error output, and those URLs carry the
/// token. Every message derived from git output goes through
/// [`Redactor::redact`] before it reaches a log line or the user.
#[derive(Clone)]
pub struct Redactor {
    placeholder: String,
    secret: String,
    encoded: String,
}

impl Redactor {
    /// Build a redactor from the raw configured token.
    pub fn new(raw_token: &str) -> Self {
        let secret = expand_value(raw_token).unwrap_or_default();
        Self::with_secret(raw_token, secret)
    }

    /// Build a redactor from an already-expanded secret.
    pub fn with_secret(placeholder: impl Into<String>, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let mut placeholder = placeholder.into();
        if placeholder == secret {
            placeholder = MASK.to_string();
        }
        let encoded = utf8_percent_encode(&secret, USERINFO).to_string();
        Self {
            placeholder,
            secret,
            encoded,
        }
    }

    /// The expanded secret. Only the credentialed remote builder reads this.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Replace every occurrence of the secret in `text` with the placeholder.
    pub fn redact(&self, text: &str) -> String {
        if self.secret.is_empty() {
            return text.to_string();
        }
        let mut out = text.replace(&self.secret, &self.placeholder);
        if self.encoded != self.secret {
            out = out.replace(&self.encoded, &self.placeholder);
        }
        out
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}
