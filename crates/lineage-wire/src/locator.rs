//! Shareable locators embedding an encoded payload.
//!
//! A locator is a location reference (typically a URL) carrying the
//! encoded state as one percent-encoded query parameter. Extraction
//! tolerates and ignores unrelated parameters, so locators survive being
//! passed through systems that append their own tracking parameters.
//!
//! No network I/O happens here; locators are plain strings.

use crate::{Error, Result};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tracing::debug;

/// Builds a locator by appending `param=<encoded payload>` to `base`.
///
/// If `base` already carries a query string the parameter is appended
/// with `&`, otherwise with `?`. The payload is percent-encoded so it
/// survives arbitrary JSON content.
#[must_use]
pub fn embed(base: &str, param: &str, payload: &str) -> String {
    let encoded = utf8_percent_encode(payload, NON_ALPHANUMERIC);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{param}={encoded}")
}

/// Extracts and decodes the payload carried under `param`.
///
/// Unrelated query parameters are ignored; the first occurrence of
/// `param` wins. Everything before the first `?` is ignored entirely,
/// so full URLs and bare query strings both work.
///
/// # Errors
///
/// Returns `Error::Locator` if the locator has no query string, the
/// parameter is absent, or the payload is not valid percent-encoded
/// UTF-8.
pub fn extract(locator: &str, param: &str) -> Result<String> {
    let query = locator
        .split_once('?')
        .map(|(_, q)| q)
        .ok_or_else(|| Error::Locator("no query string".to_string()))?;

    // Fragments are not part of the query.
    let query = query.split('#').next().unwrap_or(query);

    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == param {
            return percent_decode_str(value)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|e| {
                    debug!(param, "locator payload failed to decode");
                    Error::Locator(format!("payload is not UTF-8: {e}"))
                });
        }
    }

    debug!(param, "locator carries no matching parameter");
    Err(Error::Locator(format!("missing parameter: {param}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bare("https://example.com/lineage")]
    #[case::trailing_slash("https://example.com/lineage/")]
    #[case::existing_query("https://example.com/lineage?tab=graph")]
    #[case::bare_path("/lineage")]
    fn payload_survives_any_base(#[case] base: &str) {
        let payload = r#"{"a":[1,2],"b":"x y&z=1"}"#;
        let locator = embed(base, "graph", payload);
        assert_eq!(extract(&locator, "graph").unwrap(), payload);
    }

    #[test]
    fn embed_then_extract_round_trips() {
        let payload = r#"{"nodes":{},"name":"graph one"}"#;
        let locator = embed("https://example.com/lineage", "graph", payload);
        assert_eq!(extract(&locator, "graph").unwrap(), payload);
    }

    #[test]
    fn embed_appends_to_existing_query() {
        let locator = embed("https://example.com/?tab=graph", "graph", "{}");
        assert!(locator.starts_with("https://example.com/?tab=graph&graph="));
    }

    #[test]
    fn extract_ignores_unrelated_parameters() {
        let payload = "payload with spaces";
        let locator = embed("https://example.com/?utm_source=mail", "graph", payload);
        let locator = format!("{locator}&session=abc123");
        assert_eq!(extract(&locator, "graph").unwrap(), payload);
    }

    #[test]
    fn extract_without_query_fails() {
        let result = extract("https://example.com/lineage", "graph");
        assert!(matches!(result, Err(Error::Locator(_))));
    }

    #[test]
    fn extract_missing_parameter_fails() {
        let result = extract("https://example.com/?other=1", "graph");
        assert!(matches!(result, Err(Error::Locator(_))));
    }

    #[test]
    fn extract_stops_at_fragment() {
        let locator = format!("{}#section", embed("https://example.com/", "graph", "{}"));
        assert_eq!(extract(&locator, "graph").unwrap(), "{}");
    }
}
