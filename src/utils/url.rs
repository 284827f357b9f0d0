// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

use crate::error::{AppError, Result};

/// Extract the tracker's base domain from a repository URL.
///
/// The configured URL may point at `buglist.cgi` or `show_bug.cgi` (with an
/// optional product filter); the domain is everything up to that script,
/// with a trailing slash.
///
/// # Examples
/// ```
/// use bugsync::utils::url::tracker_domain;
///
/// assert_eq!(
///     tracker_domain("https://bugzilla.example.org/bugs/buglist.cgi?product=Core").unwrap(),
///     "https://bugzilla.example.org/bugs/"
/// );
/// ```
pub fn tracker_domain(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::config(format!("URL has no host: {raw}")))?;

    let path = parsed.path();
    let cut = path
        .find("show_bug.cgi")
        .or_else(|| path.find("buglist.cgi"))
        .unwrap_or(path.len());
    let mut prefix = path[..cut].to_string();
    if !prefix.ends_with('/') {
        prefix.push('/');
    }

    let mut domain = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        domain.push_str(&format!(":{port}"));
    }
    domain.push_str(&prefix);
    Ok(domain)
}
