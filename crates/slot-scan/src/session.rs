use reqwest::Url;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT,
};

use crate::config::WatcherConfig;
use crate::scan_types::ScanError;

/// Browser user agent sent to the shop
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:74.0) Gecko/20100101 Firefox/74.0";

/// Build the fixed header set for every deliveries request.
///
/// The session lives entirely in these headers: the cookie (and optional
/// Authorization value) copied from a logged-in browser. Nothing here renews it.
pub fn session_headers(config: &WatcherConfig) -> Result<HeaderMap, ScanError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ScanError::Config(format!("Invalid endpoint URL: {}", e)))?;
    let referer = format!("{}/", endpoint.origin().ascii_serialization());

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(REFERER, header_value("Referer", &referer)?);

    if !config.cookie.is_empty() {
        let mut cookie = header_value("Cookie", &config.cookie)?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
    }

    if let Some(authorization) = &config.authorization {
        let mut value = header_value("Authorization", authorization)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ScanError> {
    HeaderValue::from_str(value)
        .map_err(|_| ScanError::Config(format!("{} contains characters not allowed in a header", name)))
}
