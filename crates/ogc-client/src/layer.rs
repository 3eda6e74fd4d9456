//! The `Layer` trait and the request types shared by service bindings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use ogc_common::{CrsCode, LayerIdentifier, OgcError, OgcResult};

use crate::capabilities::{service_exception, CapabilitiesDocument, LayerEntry};
use crate::fetch::{fetch_with_timeout, FetchResponse, Fetcher};
use crate::query::{FormatOptions, ParamValue, QueryParams};

/// One queryable layer of a service.
///
/// Bindings override what their service supports; everything else reports
/// `UnsupportedOperation`.
#[async_trait]
pub trait Layer: Send + Sync {
    fn id(&self) -> &LayerIdentifier;

    /// Capabilities document the layer was resolved from.
    fn capabilities(&self) -> &CapabilitiesDocument;

    /// Typed entry for this layer in its capabilities document.
    fn entry(&self) -> Option<&LayerEntry> {
        self.capabilities().layer(&self.id().full)
    }

    /// Available time values, ascending and without duplicates.
    fn get_layer_dates(&self) -> OgcResult<Vec<String>> {
        Err(OgcError::UnsupportedOperation(format!(
            "get_layer_dates on {}",
            self.id()
        )))
    }

    /// URL of an image of this layer.
    fn get_image_url(&self, _params: &ImageRequestParams) -> OgcResult<String> {
        Err(OgcError::UnsupportedOperation(format!(
            "get_image_url on {}",
            self.id()
        )))
    }

    async fn get_image(&self, _params: &ImageRequestParams) -> OgcResult<Image> {
        Err(OgcError::UnsupportedOperation(format!(
            "get_image on {}",
            self.id()
        )))
    }
}

/// Parameters of a single image request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequestParams {
    /// `[minX, minY, maxX, maxY]` in `bbox_srs`
    pub bbox: [f64; 4],
    pub bbox_srs: CrsCode,
    /// CRS of the requested image
    pub srs: CrsCode,
    pub width: u32,
    pub height: u32,
    pub time: Option<String>,
    pub transparent: Option<bool>,
    /// Defaults to `image/png`
    pub format: Option<String>,
    /// Defaults to the server's default style
    pub styles: Option<String>,
    /// Vendor parameters, appended last and overriding standard ones
    pub extra: QueryParams,
}

impl ImageRequestParams {
    /// A request in EPSG:4326.
    pub fn new(bbox: [f64; 4], width: u32, height: u32) -> Self {
        Self {
            bbox,
            bbox_srs: CrsCode::WGS84,
            srs: CrsCode::WGS84,
            width,
            height,
            time: None,
            transparent: None,
            format: None,
            styles: None,
            extra: QueryParams::new(),
        }
    }

    /// Set both the bbox CRS and the image CRS.
    pub fn with_crs(mut self, crs: CrsCode) -> Self {
        self.bbox_srs = crs;
        self.srs = crs;
        self
    }

    pub fn with_bbox_srs(mut self, crs: CrsCode) -> Self {
        self.bbox_srs = crs;
        self
    }

    pub fn with_srs(mut self, crs: CrsCode) -> Self {
        self.srs = crs;
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = Some(transparent);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = Some(styles.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.extra.insert(key, value);
        self
    }
}

/// A fetched image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// What a layer needs to issue requests on behalf of its client.
#[derive(Clone)]
pub(crate) struct RequestContext {
    pub base_url: Arc<str>,
    /// Value of the `service` parameter on operation requests.
    pub service: Arc<str>,
    pub fetcher: Arc<dyn Fetcher>,
    pub timeout: Option<Duration>,
    pub format: FormatOptions,
}

impl RequestContext {
    pub(crate) async fn fetch(&self, url: &str) -> OgcResult<FetchResponse> {
        fetch_with_timeout(self.fetcher.as_ref(), url, self.timeout).await
    }

    /// Advertised URL for `operation`, else the client's base URL.
    pub(crate) fn operation_url(
        &self,
        capabilities: &CapabilitiesDocument,
        operation: &str,
    ) -> OgcResult<String> {
        Ok(capabilities
            .capability_url(operation)?
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.base_url.to_string()))
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("base_url", &self.base_url)
            .field("service", &self.service)
            .field("timeout", &self.timeout)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Servers answer some failed requests with 200 and an exception report;
/// surface those as errors.
pub(crate) fn reject_exception_report(response: &FetchResponse) -> OgcResult<()> {
    if !response.is_xml() {
        return Ok(());
    }
    let text = response.text()?;
    match service_exception(&text)? {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_params_builder() {
        let params = ImageRequestParams::new([0.0, 0.0, 1.0, 1.0], 256, 256)
            .with_crs(CrsCode::WEB_MERCATOR)
            .with_time("2022-07-11")
            .with_transparent(true)
            .with_param("TILED", true);
        assert_eq!(params.bbox_srs, CrsCode::WEB_MERCATOR);
        assert_eq!(params.srs, CrsCode::WEB_MERCATOR);
        assert_eq!(params.time.as_deref(), Some("2022-07-11"));
        assert_eq!(params.extra.get("TILED"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.format, None);
    }

    #[test]
    fn test_reject_exception_report() {
        let png = FetchResponse::new(200, Some("image/png"), vec![0x89u8, b'P', b'N', b'G']);
        assert!(reject_exception_report(&png).is_ok());

        let report = FetchResponse::new(
            200,
            Some("application/vnd.ogc.se_xml"),
            r#"<ServiceExceptionReport><ServiceException code="InvalidFormat">bad format</ServiceException></ServiceExceptionReport>"#,
        );
        let err = reject_exception_report(&report).unwrap_err();
        assert_eq!(err.ogc_exception_code(), "InvalidFormat");

        let other_xml = FetchResponse::new(200, Some("text/xml"), "<FeatureCollection/>");
        assert!(reject_exception_report(&other_xml).is_ok());
    }
}
