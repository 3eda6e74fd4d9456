//! Layer identifiers: namespace parsing and strict/loose matching.

use serde::{Deserialize, Serialize};

/// Separators that divide a namespace from a short layer name.
///
/// GeoServer uses `prefix:name`; some clients flatten that to `prefix__name`.
const SEPARATORS: [&str; 2] = [":", "__"];

/// A layer identifier split into its optional namespace and short name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerIdentifier {
    /// The identifier exactly as given
    pub full: String,
    /// Namespace prefix, e.g. `prism` in `prism:col_gdacs_buffers`
    pub namespace: Option<String>,
    /// Name without the namespace
    pub short: String,
}

impl LayerIdentifier {
    /// Parse a compound layer ID like "prism:col_gdacs_buffers".
    pub fn parse(name: &str) -> Self {
        parse_name(name)
    }

    /// Whether `self` (a candidate from a capabilities document) satisfies
    /// the lookup `target`.
    ///
    /// Loose matching requires equal short names, and equal namespaces only
    /// when the target names one.
    pub fn matches(&self, target: &LayerIdentifier, strict: bool) -> bool {
        if strict {
            return self.full == target.full;
        }
        if self.short != target.short {
            return false;
        }
        match &target.namespace {
            Some(ns) => self.namespace.as_deref() == Some(ns.as_str()),
            None => true,
        }
    }
}

impl std::fmt::Display for LayerIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

impl From<&str> for LayerIdentifier {
    fn from(s: &str) -> Self {
        parse_name(s)
    }
}

/// Split a raw identifier on the first `:` or `__`.
pub fn parse_name(name: &str) -> LayerIdentifier {
    let split = SEPARATORS
        .iter()
        .filter_map(|sep| name.find(sep).map(|idx| (idx, sep.len())))
        .min_by_key(|(idx, _)| *idx);

    match split {
        Some((idx, len)) => LayerIdentifier {
            full: name.to_string(),
            namespace: Some(name[..idx].to_string()),
            short: name[idx + len..].to_string(),
        },
        None => LayerIdentifier {
            full: name.to_string(),
            namespace: None,
            short: name.to_string(),
        },
    }
}

/// Find the first id in `ids` that matches `target`.
///
/// In loose mode an unqualified target matches any namespace, so two layers
/// sharing a short name resolve to whichever appears first in `ids`.
pub fn find_layer_id<'a, S: AsRef<str>>(ids: &'a [S], target: &str, strict: bool) -> Option<&'a str> {
    let target = parse_name(target);
    ids.iter()
        .map(AsRef::as_ref)
        .find(|id| parse_name(id).matches(&target, strict))
}

/// Whether any id in `ids` matches `target`.
pub fn has_layer_id<S: AsRef<str>>(ids: &[S], target: &str, strict: bool) -> bool {
    find_layer_id(ids, target, strict).is_some()
}
