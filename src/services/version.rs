//! Tracker version probe.

use reqwest::blocking::Client;

use crate::error::{AppError, Result};
use crate::utils::http::fetch_text;

/// Probe the tracker version by requesting metadata for an empty issue id.
///
/// The version attribute on the response's root element decides the URL
/// dialect for every later request, so any failure here is fatal.
pub fn probe_version(client: &Client, domain: &str) -> Result<String> {
    let info_url = format!("{domain}show_bug.cgi?id=&ctype=xml");
    log::debug!("Probing tracker version at {info_url}");

    let body = fetch_text(client, &info_url)?;
    let version = parse_version(&body)?;

    log::info!("Tracker version: {version}");
    Ok(version)
}

/// Read the version attribute from a metadata response body.
fn parse_version(body: &str) -> Result<String> {
    let doc = roxmltree::Document::parse(body)
        .map_err(|e| AppError::probe(format!("malformed metadata response: {e}")))?;
    doc.root_element()
        .attribute("version")
        .map(str::to_string)
        .ok_or_else(|| AppError::probe("response carries no version attribute"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_version_attribute() {
        let body = r#"<?xml version="1.0"?><bugzilla version="4.4.9" urlbase="x"></bugzilla>"#;
        assert_eq!(parse_version(body).unwrap(), "4.4.9");
    }

    #[test]
    fn missing_attribute_is_an_error() {
        let body = r#"<bugzilla urlbase="x"></bugzilla>"#;
        assert!(parse_version(body).is_err());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_version("<html>Not Found</html").is_err());
    }
}
