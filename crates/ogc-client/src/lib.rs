//! Asynchronous client for OGC web services.
//!
//! Supports:
//! - WMS 1.1.1 and 1.3.0 (capabilities, layer dates, GetMap)
//! - WFS 1.1.0 and 2.0.0 (capabilities, GetFeature)
//!
//! Clients fetch their capabilities document lazily, once, through an
//! injected [`Fetcher`], and hand out [`Layer`]s bound to that document.

pub mod cache;
pub mod capabilities;
pub mod config;
pub mod fetch;
pub mod layer;
pub mod query;
pub mod service;
pub mod wfs;
pub mod wms;
pub mod xml;

pub use cache::{CacheStats, FetchState};
pub use capabilities::{
    find_and_parse_capability_url, service_exception, CapabilitiesDocument, LayerEntry, LayerKind,
};
pub use config::ClientConfig;
pub use fetch::{FetchResponse, Fetcher, HttpFetcher, StaticFetcher};
pub use layer::{Image, ImageRequestParams, Layer};
pub use query::{format_url, format_url_with, FormatOptions, ParamValue, QueryParams};
pub use service::parse_service;
pub use wfs::{FeatureRequestParams, WfsClient, WfsLayer, DEFAULT_WFS_VERSION};
pub use wms::{WmsClient, WmsLayer, DEFAULT_WMS_VERSION};
pub use xml::{
    find_tag_by_name, find_tag_by_path, find_tags_by_name, find_tags_by_path, get_attribute,
    get_root_attribute, Tag,
};

pub use ogc_common::{
    check_extent, find_layer_id, has_layer_id, parse_name, CrsCode, Extent, LayerIdentifier,
    OgcError, OgcResult, TimeDimension,
};
