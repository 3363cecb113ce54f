//! Local validation of human input.
//!
//! Everything here runs before the transport is touched; a rejected input
//! never produces a request.

use url::Url;

use crate::classify::FormField;
use crate::error::{Error, Result};

const VALID_URL_TEXT: &str = "Enter a valid URL ie. https://holoinvites.com";
const HTTPS_ONLY_TEXT: &str = "Only https sites are currently supported.";
const SECURE_SCHEME: &str = "https://";
const MAX_HOSTNAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;

/// A site URL that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrl {
    /// The normalized URL sent to the agent backend.
    pub url: String,
    /// The host component, which names the session's site.
    pub host: String,
}

/// Check a passphrase: non-empty, ASCII letters, digits and underscores only.
pub fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.is_empty() {
        return Err(Error::validation(
            "Passphrase is required",
            Some(FormField::Passphrase),
        ));
    }
    if !passphrase
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::validation(
            "Only alphanumeric characters and underscores are allowed",
            Some(FormField::Passphrase),
        ));
    }
    Ok(())
}

/// Check and normalize a site URL, deriving its host.
///
/// The URL must use `https`, parse, and carry a DNS host name. Normalization
/// drops the fragment and a trailing slash on a non-root path.
pub fn validate_url(raw: &str) -> Result<SiteUrl> {
    let raw = raw.trim();
    let invalid = || Error::validation(VALID_URL_TEXT, Some(FormField::Url));
    if raw.is_empty() {
        return Err(invalid());
    }
    if !raw.starts_with(SECURE_SCHEME) {
        return Err(Error::validation(
            format!("{VALID_URL_TEXT}. {HTTPS_ONLY_TEXT}"),
            Some(FormField::Url),
        ));
    }
    let mut url = Url::parse(raw).map_err(|_| invalid())?;
    let host = match url.host_str() {
        Some(host) if is_valid_hostname(host) => host.to_ascii_lowercase(),
        _ => return Err(invalid()),
    };
    url.set_fragment(None);
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }
    Ok(SiteUrl {
        url: url.to_string(),
        host,
    })
}

/// Check a free-text turn, returning it trimmed.
pub fn validate_message(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::validation(
            "Message is required",
            Some(FormField::Message),
        ));
    }
    Ok(content.to_string())
}

/// Returns true if `hostname` is a syntactically valid DNS name.
///
/// One trailing dot is tolerated.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return false;
    }
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);
    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
