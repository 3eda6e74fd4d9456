//! Web Feature Service client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ogc_common::crs::version_at_least;
use ogc_common::{
    check_extent, find_layer_id, AxisOrder, CrsCode, Extent, LayerIdentifier, OgcError, OgcResult,
};

use crate::cache::{CacheStats, CapabilitiesCache, FetchState};
use crate::capabilities::{CapabilitiesDocument, LayerEntry, LayerKind};
use crate::config::ClientConfig;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::layer::{reject_exception_report, Layer, RequestContext};
use crate::query::{format_url_with, FormatOptions, ParamValue, QueryParams};
use crate::service::{capabilities_url, detect_service};

/// Version requested when the configuration names none.
pub const DEFAULT_WFS_VERSION: &str = "1.1.0";

const DEFAULT_OUTPUT_FORMAT: &str = "application/json";

/// Parameters of a `GetFeature` request. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRequestParams {
    /// `[minX, minY, maxX, maxY]`
    pub bbox: Option<[f64; 4]>,
    /// Appended to the bbox value when set
    pub bbox_srs: Option<CrsCode>,
    /// `count` from WFS 2.0 on, `maxFeatures` before
    pub count: Option<u32>,
    /// Defaults to `application/json`
    pub output_format: Option<String>,
    /// `srsName` of the returned geometries
    pub srs: Option<CrsCode>,
    pub extra: QueryParams,
}

impl FeatureRequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bbox(mut self, bbox: [f64; 4], srs: Option<CrsCode>) -> Self {
        self.bbox = Some(bbox);
        self.bbox_srs = srs;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_srs(mut self, srs: CrsCode) -> Self {
        self.srs = Some(srs);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.extra.insert(key, value);
        self
    }
}

/// Entry point for one WFS endpoint.
pub struct WfsClient {
    config: ClientConfig,
    context: RequestContext,
    cache: CapabilitiesCache,
}

impl WfsClient {
    pub fn new(base_url: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> OgcResult<Self> {
        Self::with_config(base_url, fetcher, ClientConfig::default())
    }

    pub fn with_config(
        base_url: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        config: ClientConfig,
    ) -> OgcResult<Self> {
        config.validate()?;
        let base_url: String = base_url.into();
        let format = FormatOptions {
            sort_params: config.sort_params,
        };
        let service = detect_service(&base_url, "WFS");
        let caps_url = capabilities_url(
            &base_url,
            &service,
            config.version_or(DEFAULT_WFS_VERSION),
            format,
        )?;
        debug!(base_url = %base_url, capabilities_url = %caps_url, "Created WFS client");

        let context = RequestContext {
            base_url: base_url.into(),
            service: service.into(),
            fetcher: fetcher.clone(),
            timeout: config.timeout(),
            format,
        };
        let cache =
            CapabilitiesCache::new(caps_url, LayerKind::Feature, fetcher, config.timeout());

        Ok(Self {
            config,
            context,
            cache,
        })
    }

    pub fn from_config(base_url: impl Into<String>, config: ClientConfig) -> OgcResult<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Self::with_config(base_url, fetcher, config)
    }

    pub fn base_url(&self) -> &str {
        &self.context.base_url
    }

    pub fn get_capabilities_url(&self) -> &str {
        self.cache.url()
    }

    pub async fn capabilities(&self) -> OgcResult<CapabilitiesDocument> {
        self.cache.get().await
    }

    /// Feature type names in document order.
    pub async fn get_layer_ids(&self) -> OgcResult<Vec<String>> {
        Ok(self.capabilities().await?.layer_ids())
    }

    pub async fn get_layer_names(&self) -> OgcResult<Vec<String>> {
        Ok(self.capabilities().await?.layer_titles())
    }

    pub async fn layers(&self) -> OgcResult<Vec<LayerEntry>> {
        Ok(self.capabilities().await?.layers().to_vec())
    }

    pub async fn version(&self) -> OgcResult<String> {
        let doc = self.capabilities().await?;
        Ok(doc
            .version()
            .unwrap_or_else(|| self.config.version_or(DEFAULT_WFS_VERSION))
            .to_string())
    }

    pub async fn get_capability_url(&self, operation: &str) -> OgcResult<Option<String>> {
        self.capabilities().await?.capability_url(operation)
    }

    /// Resolve `id` exactly, then by short name and namespace.
    pub async fn get_layer(&self, id: &str) -> OgcResult<WfsLayer> {
        let capabilities = self.capabilities().await?;
        let ids = capabilities.layer_ids();
        let found = find_layer_id(&ids, id, true)
            .or_else(|| find_layer_id(&ids, id, false))
            .ok_or_else(|| OgcError::LayerNotFound(id.to_string()))?;

        let version = capabilities
            .version()
            .unwrap_or_else(|| self.config.version_or(DEFAULT_WFS_VERSION))
            .to_string();

        Ok(WfsLayer {
            id: LayerIdentifier::parse(found),
            version,
            capabilities,
            context: self.context.clone(),
        })
    }

    pub fn refresh(&self) {
        self.cache.invalidate();
    }

    pub fn fetch_state(&self) -> FetchState {
        self.cache.state()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// A WFS feature type.
#[derive(Debug, Clone)]
pub struct WfsLayer {
    id: LayerIdentifier,
    version: String,
    capabilities: CapabilitiesDocument,
    context: RequestContext,
}

impl WfsLayer {
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `GetFeature` URL for this feature type.
    pub fn get_features_url(&self, params: &FeatureRequestParams) -> OgcResult<String> {
        let wfs2 = version_at_least(&self.version, (2, 0));
        let (type_key, count_key) = if wfs2 {
            ("typeNames", "count")
        } else {
            ("typeName", "maxFeatures")
        };

        let bbox = match params.bbox {
            Some(bbox) => {
                check_extent(&bbox)?;
                let extent = Extent::try_from(bbox)?;
                let mut value = extent.to_wms_string(AxisOrder::XY);
                if let Some(srs) = params.bbox_srs {
                    value.push_str(&format!(",{}", srs));
                }
                Some(value)
            }
            None => None,
        };

        let output_format = params
            .output_format
            .clone()
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());

        let mut query = QueryParams::new()
            .set("service", &*self.context.service)
            .set("request", "GetFeature")
            .set("version", self.version.as_str())
            .set(type_key, &self.id.full)
            .set("outputFormat", output_format)
            .set("bbox", bbox)
            .set(count_key, params.count)
            .set("srsName", params.srs.map(|srs| srs.to_string()));
        query.extend(&params.extra);

        let base = self.context.operation_url(&self.capabilities, "GetFeature")?;
        let url = format_url_with(&base, &query, self.context.format)?;
        debug!(layer = %self.id, url = %url, "Built GetFeature URL");
        Ok(url)
    }

    /// Fetch features as JSON (GeoJSON for the default output format).
    pub async fn get_features(&self, params: &FeatureRequestParams) -> OgcResult<serde_json::Value> {
        let url = self.get_features_url(params)?;
        let response = self.context.fetch(&url).await?;
        if !response.ok() {
            warn!(layer = %self.id, url = %url, status = response.status, "GetFeature request failed");
            return Err(OgcError::FeatureFetch {
                status: response.status,
                url,
            });
        }
        reject_exception_report(&response)?;

        let value: serde_json::Value = response.json()?;
        let count = value
            .get("features")
            .and_then(|f| f.as_array())
            .map(|f| f.len());
        info!(layer = %self.id, features = ?count, "Fetched features");
        Ok(value)
    }
}

#[async_trait]
impl Layer for WfsLayer {
    fn id(&self) -> &LayerIdentifier {
        &self.id
    }

    fn capabilities(&self) -> &CapabilitiesDocument {
        &self.capabilities
    }
}
