//! Input validation for the registration and chat surfaces.
//!
//! Site URLs are dereferenced during callback attestation, so the URL
//! validator doubles as the SSRF guard: private, loopback, and
//! link-local hosts are rejected unless development mode is enabled.

use url::{Host, Url};

use crate::error::{Error, Result};

/// Maximum accepted callback token length.
const CALLBACK_TOKEN_MAX: usize = 256;
/// Minimum callback token length in production.
const CALLBACK_TOKEN_MIN: usize = 16;
/// Relaxed minimum under development mode.
const CALLBACK_TOKEN_MIN_DEV: usize = 4;

/// Validate a site URL and return it normalized (single trailing slash
/// stripped). `development_mode` lifts the private-host restriction,
/// nothing else.
pub fn validate_site_url(raw: &str, development_mode: bool) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|_| Error::Validation("site_url is not a valid absolute URL".into()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Validation(format!(
                "site_url scheme must be http or https, got {other}"
            )));
        }
    }

    let host = url
        .host()
        .ok_or_else(|| Error::Validation("site_url has no host".into()))?;

    if !development_mode && host_is_blocked(&host) {
        return Err(Error::Validation(
            "private, loopback, and link-local hosts are not allowed".into(),
        ));
    }

    Ok(raw.strip_suffix('/').unwrap_or(raw).to_string())
}

/// Derive the normalized domain from an already-validated site URL:
/// lowercase host, port appended only when explicit and non-default.
pub fn derive_domain(site_url: &str) -> Result<String> {
    let url = Url::parse(site_url)
        .map_err(|_| Error::Validation("site_url is not a valid absolute URL".into()))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Validation("site_url has no host".into()))?
        .to_ascii_lowercase();

    // Url::port() is None when the port matches the scheme default.
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Structural RFC-5322-compatible email check: one `@`, bounded local
/// part, dotted domain of sane labels. Not a deliverability check.
pub fn validate_admin_email(raw: &str) -> Result<()> {
    let invalid = || Error::Validation("admin_email is not a valid email address".into());

    let email = raw.trim();
    if email.is_empty() || email.len() > 254 {
        return Err(invalid());
    }

    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || local.len() > 64 {
        return Err(invalid());
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_graphic() && c != '@' && c != ',')
    {
        return Err(invalid());
    }

    if !domain.contains('.') {
        return Err(invalid());
    }
    for label in domain.split('.') {
        if label.is_empty()
            || label.starts_with('-')
            || label.ends_with('-')
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid());
        }
    }

    Ok(())
}

/// Callback tokens must be printable and within length bounds;
/// development mode only relaxes the minimum.
pub fn validate_callback_token(raw: &str, development_mode: bool) -> Result<()> {
    let min = if development_mode {
        CALLBACK_TOKEN_MIN_DEV
    } else {
        CALLBACK_TOKEN_MIN
    };

    if raw.len() < min {
        return Err(Error::Validation(format!(
            "callback_token must be at least {min} characters"
        )));
    }
    if raw.len() > CALLBACK_TOKEN_MAX {
        return Err(Error::Validation(format!(
            "callback_token must not exceed {CALLBACK_TOKEN_MAX} characters"
        )));
    }
    if raw.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(Error::Validation(
            "callback_token must contain only printable characters".into(),
        ));
    }

    Ok(())
}

/// Session ids are client-minted: 32-64 ASCII alphanumerics.
pub fn validate_session_id(raw: &str) -> Result<()> {
    if raw.len() < 32 || raw.len() > 64 || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation("invalid session_id format".into()));
    }
    Ok(())
}

fn host_is_blocked(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let d = domain.to_ascii_lowercase();
            d == "localhost" || d.ends_with(".localhost")
        }
        Host::Ipv4(ip) => {
            ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
        }
        Host::Ipv6(ip) => {
            let seg = ip.segments();
            ip.is_loopback()
                || ip.is_unspecified()
                // fc00::/7 unique local
                || (seg[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (seg[0] & 0xffc0) == 0xfe80
        }
    }
}
