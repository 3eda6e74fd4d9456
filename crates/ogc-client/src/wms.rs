//! Web Map Service client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use ogc_common::crs::{reproject_extent, version_at_least};
use ogc_common::{check_extent, find_layer_id, Extent, LayerIdentifier, OgcError, OgcResult};

use crate::cache::{CacheStats, CapabilitiesCache, FetchState};
use crate::capabilities::{CapabilitiesDocument, LayerEntry, LayerKind};
use crate::config::ClientConfig;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::layer::{reject_exception_report, Image, ImageRequestParams, Layer, RequestContext};
use crate::query::{format_url_with, FormatOptions, QueryParams};
use crate::service::{capabilities_url, detect_service};

/// Version requested when the configuration names none.
pub const DEFAULT_WMS_VERSION: &str = "1.3.0";

const DEFAULT_IMAGE_FORMAT: &str = "image/png";

/// Entry point for one WMS endpoint.
///
/// The capabilities document is fetched lazily on first use and shared by
/// every layer the client hands out.
pub struct WmsClient {
    config: ClientConfig,
    context: RequestContext,
    cache: CapabilitiesCache,
}

impl WmsClient {
    /// Client with default configuration.
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
        let service = detect_service(&base_url, "WMS");
        let caps_url = capabilities_url(
            &base_url,
            &service,
            config.version_or(DEFAULT_WMS_VERSION),
            format,
        )?;
        debug!(base_url = %base_url, capabilities_url = %caps_url, "Created WMS client");

        let context = RequestContext {
            base_url: base_url.into(),
            service: service.into(),
            fetcher: fetcher.clone(),
            timeout: config.timeout(),
            format,
        };
        let cache = CapabilitiesCache::new(caps_url, LayerKind::Map, fetcher, config.timeout());

        Ok(Self {
            config,
            context,
            cache,
        })
    }

    /// Client fetching over HTTP with `reqwest`.
    pub fn from_config(base_url: impl Into<String>, config: ClientConfig) -> OgcResult<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Self::with_config(base_url, fetcher, config)
    }

    pub fn base_url(&self) -> &str {
        &self.context.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get_capabilities_url(&self) -> &str {
        self.cache.url()
    }

    pub async fn capabilities(&self) -> OgcResult<CapabilitiesDocument> {
        self.cache.get().await
    }

    /// Names of every named layer, in document order.
    pub async fn get_layer_ids(&self) -> OgcResult<Vec<String>> {
        Ok(self.capabilities().await?.layer_ids())
    }

    /// Titles aligned by index with [`WmsClient::get_layer_ids`].
    pub async fn get_layer_names(&self) -> OgcResult<Vec<String>> {
        Ok(self.capabilities().await?.layer_titles())
    }

    /// Every `Layer` element, named or not, in document order.
    pub async fn layers(&self) -> OgcResult<Vec<LayerEntry>> {
        Ok(self.capabilities().await?.layers().to_vec())
    }

    /// Version announced by the server, else the one requested.
    pub async fn version(&self) -> OgcResult<String> {
        let doc = self.capabilities().await?;
        Ok(doc
            .version()
            .unwrap_or_else(|| self.config.version_or(DEFAULT_WMS_VERSION))
            .to_string())
    }

    /// Request URL the server advertises for `operation`.
    pub async fn get_capability_url(&self, operation: &str) -> OgcResult<Option<String>> {
        self.capabilities().await?.capability_url(operation)
    }

    /// Resolve `id` exactly, then by short name and namespace.
    pub async fn get_layer(&self, id: &str) -> OgcResult<WmsLayer> {
        let capabilities = self.capabilities().await?;
        let ids = capabilities.layer_ids();
        let found = find_layer_id(&ids, id, true)
            .or_else(|| find_layer_id(&ids, id, false))
            .ok_or_else(|| OgcError::LayerNotFound(id.to_string()))?;
        if found != id {
            debug!(requested = %id, resolved = %found, "Resolved layer by short name");
        }

        let version = capabilities
            .version()
            .unwrap_or_else(|| self.config.version_or(DEFAULT_WMS_VERSION))
            .to_string();

        Ok(WmsLayer {
            id: LayerIdentifier::parse(found),
            version,
            capabilities,
            context: self.context.clone(),
        })
    }

    /// Forget the cached document; the next call fetches it again.
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

/// A WMS layer bound to the capabilities document it was found in.
#[derive(Debug, Clone)]
pub struct WmsLayer {
    id: LayerIdentifier,
    version: String,
    capabilities: CapabilitiesDocument,
    context: RequestContext,
}

impl WmsLayer {
    /// Version used in requests for this layer.
    pub fn version(&self) -> &str {
        &self.version
    }
}

#[async_trait]
impl Layer for WmsLayer {
    fn id(&self) -> &LayerIdentifier {
        &self.id
    }

    fn capabilities(&self) -> &CapabilitiesDocument {
        &self.capabilities
    }

    fn get_layer_dates(&self) -> OgcResult<Vec<String>> {
        let time = self
            .entry()
            .and_then(|entry| entry.time.as_ref())
            .ok_or_else(|| OgcError::NoTimeDimension(self.id.full.clone()))?;
        time.expand()
    }

    fn get_image_url(&self, params: &ImageRequestParams) -> OgcResult<String> {
        check_extent(&params.bbox)?;
        let extent = Extent::try_from(params.bbox)?;
        let extent = reproject_extent(&extent, params.bbox_srs, params.srs)?;

        let version = self.version.as_str();
        let crs_key = if version_at_least(version, (1, 3)) {
            "crs"
        } else {
            "srs"
        };
        let format = params
            .format
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGE_FORMAT.to_string());

        let mut query = QueryParams::new()
            .set("service", &*self.context.service)
            .set("request", "GetMap")
            .set("version", version)
            .set("layers", &self.id.full)
            .set("styles", params.styles.clone().unwrap_or_default())
            .set("format", format)
            .set("bbox", extent.to_wms_string(params.srs.axis_order(version)))
            .set(crs_key, params.srs.to_string())
            .set("width", params.width)
            .set("height", params.height)
            .set("time", params.time.clone())
            .set("transparent", params.transparent);
        query.extend(&params.extra);

        let base = self.context.operation_url(&self.capabilities, "GetMap")?;
        let url = format_url_with(&base, &query, self.context.format)?;
        debug!(layer = %self.id, url = %url, "Built GetMap URL");
        Ok(url)
    }

    async fn get_image(&self, params: &ImageRequestParams) -> OgcResult<Image> {
        let url = self.get_image_url(params)?;
        let response = self.context.fetch(&url).await?;
        if !response.ok() {
            warn!(layer = %self.id, url = %url, status = response.status, "GetMap request failed");
            return Err(OgcError::ImageFetch {
                status: response.status,
                url,
            });
        }
        reject_exception_report(&response)?;

        Ok(Image {
            bytes: response.bytes(),
            content_type: response.content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchResponse, StaticFetcher};
    use ogc_common::CrsCode;

    const CAPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Capability>
    <Request>
      <GetMap>
        <Format>image/png</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:href="https://tiles.example.com/wms?map=prism"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Layer>
      <Title>PRISM</Title>
      <CRS>EPSG:4326</CRS>
      <Layer>
        <Name>prism:col_gdacs_buffers</Name>
        <Title>GDACS buffers</Title>
      </Layer>
      <Layer>
        <Name>rainfall</Name>
        <Title>Rainfall</Title>
        <Dimension name="time" units="ISO8601">2020-01-21,2020-01-01,2020-01-11,2020-01-01</Dimension>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    fn client() -> (WmsClient, Arc<StaticFetcher>) {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_xml("request=GetCapabilities", CAPS)
                .with_route(
                    "request=GetMap",
                    FetchResponse::new(200, Some("image/png"), vec![0x89u8, b'P', b'N', b'G']),
                ),
        );
        let client = WmsClient::new("https://maps.example.com/wms", fetcher.clone()).unwrap();
        (client, fetcher)
    }

    #[test]
    fn test_capabilities_url() {
        let (client, fetcher) = client();
        assert_eq!(
            client.get_capabilities_url(),
            "https://maps.example.com/wms?request=GetCapabilities&service=WMS&version=1.3.0"
        );
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_layer_lookup() {
        let (client, _) = client();
        assert_eq!(
            client.get_layer_ids().await.unwrap(),
            vec!["prism:col_gdacs_buffers", "rainfall"]
        );
        assert_eq!(
            client.get_layer_names().await.unwrap(),
            vec!["GDACS buffers", "Rainfall"]
        );

        let layer = client.get_layer("col_gdacs_buffers").await.unwrap();
        assert_eq!(layer.id().full, "prism:col_gdacs_buffers");

        let err = client.get_layer("other:col_gdacs_buffers").await.unwrap_err();
        assert_eq!(err, OgcError::LayerNotFound("other:col_gdacs_buffers".to_string()));
    }

    #[tokio::test]
    async fn test_layer_dates() {
        let (client, _) = client();
        let layer = client.get_layer("rainfall").await.unwrap();
        assert_eq!(
            layer.get_layer_dates().unwrap(),
            vec!["2020-01-01", "2020-01-11", "2020-01-21"]
        );

        let layer = client.get_layer("prism:col_gdacs_buffers").await.unwrap();
        assert!(matches!(layer.get_layer_dates(), Err(OgcError::NoTimeDimension(_))));
    }

    #[tokio::test]
    async fn test_image_url_uses_advertised_endpoint() {
        let (client, _) = client();
        let layer = client.get_layer("rainfall").await.unwrap();
        let params = ImageRequestParams::new([-10.0, 20.0, 30.0, 40.0], 512, 256);
        let url = layer.get_image_url(&params).unwrap();
        // 1.3.0 with EPSG:4326 is lat/lon
        assert_eq!(
            url,
            "https://tiles.example.com/wms?map=prism&bbox=20%2C-10%2C40%2C30&crs=EPSG%3A4326\
             &format=image%2Fpng&height=256&layers=rainfall&request=GetMap&service=WMS\
             &styles=&version=1.3.0&width=512"
        );
    }

    #[tokio::test]
    async fn test_image_url_reprojects_bbox() {
        let (client, _) = client();
        let layer = client.get_layer("rainfall").await.unwrap();
        let params = ImageRequestParams::new([0.0, 0.0, 180.0, 0.0], 256, 256)
            .with_srs(CrsCode::WEB_MERCATOR);
        let url = url::Url::parse(&layer.get_image_url(&params).unwrap()).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["crs"], "EPSG:3857");
        let bbox: Vec<f64> = query["bbox"].split(',').map(|v| v.parse().unwrap()).collect();
        assert!(bbox[0].abs() < 1e-6);
        assert!(bbox[1].abs() < 1e-6);
        assert!((bbox[2] - 20037508.342789244).abs() < 1e-3);

        let params = params.with_srs(CrsCode(32633));
        assert!(matches!(
            layer.get_image_url(&params),
            Err(OgcError::UnsupportedCrs(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_extent_before_io() {
        let (client, fetcher) = client();
        let layer = client.get_layer("rainfall").await.unwrap();
        let params = ImageRequestParams::new([10.0, 0.0, -10.0, 1.0], 256, 256);
        assert!(matches!(
            layer.get_image(&params).await,
            Err(OgcError::MalformedExtent(_))
        ));
        // Only the capabilities request went out
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_get_image() {
        let (client, _) = client();
        let layer = client.get_layer("rainfall").await.unwrap();
        let image = layer
            .get_image(&ImageRequestParams::new([0.0, 0.0, 1.0, 1.0], 64, 64))
            .await
            .unwrap();
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
        assert_eq!(&image.bytes[..], &[0x89u8, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_service_detected_from_base_url() {
        let caps = r#"<WMS_Capabilities version="1.3.0">
  <Capability><Layer><Name>rain</Name><Title>Rain</Title></Layer></Capability>
</WMS_Capabilities>"#;
        let fetcher = Arc::new(StaticFetcher::new().with_xml("request=GetCapabilities", caps));
        let client =
            WmsClient::new("https://maps.example.com/ows?SERVICE=wms&map=rain", fetcher).unwrap();
        assert_eq!(
            client.get_capabilities_url(),
            "https://maps.example.com/ows?SERVICE=wms&map=rain&request=GetCapabilities&version=1.3.0"
        );

        // No GetMap endpoint advertised: the base URL is reused
        let layer = client.get_layer("rain").await.unwrap();
        let url = layer
            .get_image_url(&ImageRequestParams::new([0.0, 0.0, 10.0, 10.0], 256, 256))
            .unwrap();
        assert_eq!(
            url,
            "https://maps.example.com/ows?service=WMS&map=rain&bbox=0%2C0%2C10%2C10\
             &crs=EPSG%3A4326&format=image%2Fpng&height=256&layers=rain&request=GetMap\
             &styles=&version=1.3.0&width=256"
        );
    }
}
