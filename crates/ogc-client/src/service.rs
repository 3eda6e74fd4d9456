//! OGC service type detection from URLs.

use tracing::debug;
use url::Url;

use ogc_common::OgcResult;

use crate::query::{format_url_with, FormatOptions, QueryParams};

/// Service names recognised as a trailing path segment.
const KNOWN_SERVICES: [&str; 5] = ["wcs", "wfs", "wms", "wmts", "wps"];

/// Infer the OGC service a URL points at.
///
/// Tries, in order: a non-empty `service` query parameter (key matched
/// case-insensitively, as OGC KVP keys are), then a trailing path segment
/// naming a known service. The result is lower-cased unless `raw_case` is
/// set. `None` means the service could not be determined, which is not an
/// error.
pub fn parse_service(url: &str, raw_case: bool) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(url = %url, error = %e, "Cannot detect service of unparseable URL");
            return None;
        }
    };

    let apply_case = |s: &str| {
        if raw_case {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };

    if let Some((_, value)) = parsed
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("service"))
    {
        if !value.is_empty() {
            return Some(apply_case(&value));
        }
    }

    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if KNOWN_SERVICES.contains(&segment.to_lowercase().as_str()) {
        Some(apply_case(segment))
    } else {
        None
    }
}

/// Whether the URL already carries a `service` query parameter.
pub(crate) fn has_service_param(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.query_pairs().any(|(k, _)| k.eq_ignore_ascii_case("service")))
        .unwrap_or(false)
}

/// Service name to put in requests built from `url`: the detected service,
/// upper-cased, or `fallback` when nothing can be detected.
pub(crate) fn detect_service(url: &str, fallback: &str) -> String {
    parse_service(url, false)
        .map(|service| service.to_uppercase())
        .unwrap_or_else(|| fallback.to_string())
}

/// GetCapabilities URL at `base`.
///
/// The `service` parameter is only added when the base URL does not already
/// name one, so endpoints like `.../ows?service=WFS` keep their own.
pub(crate) fn capabilities_url(
    base: &str,
    service: &str,
    version: &str,
    options: FormatOptions,
) -> OgcResult<String> {
    let mut params = QueryParams::new()
        .set("request", "GetCapabilities")
        .set("version", version);
    if !has_service_param(base) {
        params.insert("service", service);
    }
    format_url_with(base, &params, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parameter_wins() {
        assert_eq!(
            parse_service("https://example.com/geoserver/wfs?service=WMS", false).as_deref(),
            Some("wms")
        );
        assert_eq!(
            parse_service("https://example.com/ows?SERVICE=WFS&request=GetCapabilities", true)
                .as_deref(),
            Some("WFS")
        );
    }

    #[test]
    fn test_empty_query_parameter_falls_through() {
        assert_eq!(
            parse_service("https://example.com/geoserver/wcs?service=", false).as_deref(),
            Some("wcs")
        );
    }

    #[test]
    fn test_trailing_segment() {
        assert_eq!(
            parse_service("https://example.com/geoserver/WMTS/", false).as_deref(),
            Some("wmts")
        );
        assert_eq!(
            parse_service("https://example.com/geoserver/WMTS", true).as_deref(),
            Some("WMTS")
        );
        assert_eq!(
            parse_service("https://example.com/wps", false).as_deref(),
            Some("wps")
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(parse_service("https://example.com/ows", false), None);
        assert_eq!(parse_service("https://example.com/", false), None);
        assert_eq!(parse_service("not a url", false), None);
        assert_eq!(
            parse_service("https://example.com/wms/layers", false),
            None
        );
    }

    #[test]
    fn test_has_service_param() {
        assert!(has_service_param("https://example.com/ows?Service=WMS"));
        assert!(!has_service_param("https://example.com/wms"));
    }

    #[test]
    fn test_detect_service() {
        assert_eq!(detect_service("https://example.com/geoserver/wms", "WFS"), "WMS");
        assert_eq!(detect_service("https://example.com/ows?service=wfs", "WMS"), "WFS");
        assert_eq!(detect_service("https://example.com/ows", "WMS"), "WMS");
        assert_eq!(detect_service("https://example.com/ows?service=", "WFS"), "WFS");
    }

    #[test]
    fn test_capabilities_url() {
        let url = capabilities_url(
            "https://example.com/geoserver/wms",
            "WMS",
            "1.3.0",
            FormatOptions::default(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://example.com/geoserver/wms?request=GetCapabilities&service=WMS&version=1.3.0"
        );

        let url = capabilities_url(
            "https://example.com/ows?service=wfs",
            "WMS",
            "1.1.0",
            FormatOptions::default(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://example.com/ows?service=wfs&request=GetCapabilities&version=1.1.0"
        );
    }
}
