//! Commit message templating.
//!
//! Supported tokens: `{site}`, `{site_id}`, `{branch}`, `{remote}`,
//! `{count}` and `{date}` (UTC, RFC 3339). Anything else in braces is left
//! as written.

use chrono::{DateTime, SecondsFormat, Utc};

/// Message used when a template renders to nothing.
pub const DEFAULT_MESSAGE: &str = "Auto deploy commit";

/// Values substituted into a commit message template.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub site_uid: String,
    pub site_id: Option<u32>,
    pub branch: String,
    pub remote: String,
    /// Files synchronized for the site in this run.
    pub count: usize,
    pub date: DateTime<Utc>,
}

/// A commit message template.
#[derive(Debug, Clone)]
pub struct CommitMessage {
    template: String,
}

impl CommitMessage {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render against `ctx`. The result is always a non-empty, NUL-free
    /// message safe to hand to git as one argument.
    ///
    /// Tokens are substituted in one pass, so braces inside substituted
    /// values are never expanded again.
    pub fn render(&self, ctx: &MessageContext) -> String {
        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let tail = &rest[open..];
            let value = tail
                .find('}')
                .and_then(|close| token_value(&tail[1..close], ctx).map(|v| (close, v)));
            match value {
                Some((close, value)) => {
                    rendered.push_str(&value);
                    rest = &tail[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = &tail[1..];
                }
            }
        }
        rendered.push_str(rest);
        sanitize(&rendered)
    }
}

fn token_value(name: &str, ctx: &MessageContext) -> Option<String> {
    let value = match name {
        "site" => ctx.site_uid.clone(),
        "site_id" => ctx.site_id.map(|id| id.to_string()).unwrap_or_default(),
        "branch" => ctx.branch.clone(),
        "remote" => ctx.remote.clone(),
        "count" => ctx.count.to_string(),
        "date" => ctx.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        _ => return None,
    };
    Some(value)
}

impl Default for CommitMessage {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE)
    }
}

/// Strip NUL bytes and surrounding whitespace, falling back to
/// [`DEFAULT_MESSAGE`].
pub fn sanitize(message: &str) -> String {
    let cleaned: String = message.chars().filter(|c| *c != '\0').collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}
