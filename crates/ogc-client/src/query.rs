//! Query-string URL construction.

use std::fmt;

use url::Url;

use ogc_common::{OgcError, OgcResult};

/// A query parameter value.
///
/// `Undefined` parameters are left out of the URL entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Undefined,
}

impl ParamValue {
    /// Canonical string form, or `None` for `Undefined`.
    pub fn to_query_value(&self) -> Option<String> {
        match self {
            ParamValue::Undefined => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Undefined => Ok(()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Str(s.clone())
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ParamValue {
            fn from(v: $t) -> Self {
                ParamValue::Int(v as i64)
            }
        })*
    };
}

impl_from_int!(i32, i64, u16, u32);

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParamValue::Undefined)
    }
}

/// An ordered set of query parameters; setting a key twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`QueryParams::insert`].
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert every entry of `other`, overriding existing keys.
    pub fn extend(&mut self, other: &QueryParams) {
        for (key, value) in &other.entries {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Options for [`format_url_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Serialize new keys in lexicographic order instead of insertion order
    pub sort_params: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { sort_params: true }
    }
}

/// Build `base` + `params` with keys sorted.
pub fn format_url(base: &str, params: &QueryParams) -> OgcResult<String> {
    format_url_with(base, params, FormatOptions::default())
}

/// Build a URL from `base` and `params`.
///
/// Values are form-urlencoded (`,` becomes `%2C`, `:` becomes `%3A`).
/// A key already present in the base query, compared case-insensitively as
/// OGC parameter names are, is replaced in place and its duplicates are
/// dropped; other existing pairs are kept. A base without a path gains a
/// trailing `/`.
pub fn format_url_with(base: &str, params: &QueryParams, options: FormatOptions) -> OgcResult<String> {
    let mut url = Url::parse(base).map_err(|e| OgcError::malformed_url(base, e))?;
    if url.cannot_be_a_base() {
        return Err(OgcError::malformed_url(base, "not a hierarchical URL"));
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    let mut keys: Vec<(&str, &ParamValue)> = params.iter().collect();
    if options.sort_params {
        keys.sort_by(|a, b| a.0.cmp(b.0));
    }

    for (key, value) in keys {
        let Some(value) = value.to_query_value() else {
            continue;
        };
        match pairs.iter().position(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(idx) => {
                pairs[idx] = (key.to_string(), value);
                let mut i = idx + 1;
                while i < pairs.len() {
                    if pairs[i].0.eq_ignore_ascii_case(key) {
                        pairs.remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
            None => pairs.push((key.to_string(), value)),
        }
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_and_encoded() {
        let params = QueryParams::new()
            .set("version", "1.3.0")
            .set("bbox", "1,2,3,4")
            .set("crs", "EPSG:4326");
        let url = format_url("https://example.com/wms", &params).unwrap();
        assert_eq!(
            url,
            "https://example.com/wms?bbox=1%2C2%2C3%2C4&crs=EPSG%3A4326&version=1.3.0"
        );
    }

    #[test]
    fn test_insertion_order_preserved() {
        let params = QueryParams::new().set("z", 1i32).set("a", 2i32);
        let url = format_url_with(
            "https://example.com/wms",
            &params,
            FormatOptions { sort_params: false },
        )
        .unwrap();
        assert_eq!(url, "https://example.com/wms?z=1&a=2");
    }

    #[test]
    fn test_undefined_omitted() {
        let params = QueryParams::new()
            .set("time", None::<String>)
            .set("transparent", Some(true))
            .set("width", 256u32)
            .set("ratio", 1.5);
        let url = format_url("https://example.com/wms", &params).unwrap();
        assert_eq!(url, "https://example.com/wms?ratio=1.5&transparent=true&width=256");
        assert!(!url.contains("undefined"));
        assert!(!url.contains("time"));
    }

    #[test]
    fn test_bare_host_gets_slash() {
        let url = format_url("https://example.com", &QueryParams::new().set("a", "b")).unwrap();
        assert_eq!(url, "https://example.com/?a=b");

        let url = format_url("https://example.com", &QueryParams::new()).unwrap();
        assert_eq!(url, "https://example.com/");

        let url = format_url("https://example.com/geoserver/ows", &QueryParams::new()).unwrap();
        assert_eq!(url, "https://example.com/geoserver/ows");
    }

    #[test]
    fn test_existing_query_replaced_case_insensitively() {
        let params = QueryParams::new()
            .set("service", "WMS")
            .set("request", "GetMap");
        let url = format_url("https://example.com/ows?SERVICE=WFS&map=a&Service=WCS", &params)
            .unwrap();
        assert_eq!(url, "https://example.com/ows?service=WMS&map=a&request=GetMap");
    }

    #[test]
    fn test_malformed_base() {
        let result = format_url("/relative/wms", &QueryParams::new());
        assert!(matches!(result, Err(OgcError::MalformedUrl { .. })));
        let result = format_url("mailto:someone@example.com", &QueryParams::new());
        assert!(matches!(result, Err(OgcError::MalformedUrl { .. })));
    }

    #[test]
    fn test_last_insert_wins() {
        let params = QueryParams::new().set("a", 1i32).set("a", 2i32);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("a"), Some(&ParamValue::Int(2)));
    }
}
