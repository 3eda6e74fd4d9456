//! End-to-end tests through `HttpFetcher` against a mock HTTP server.

use std::sync::Arc;

use ogc_client::{
    ClientConfig, FetchState, Fetcher, HttpFetcher, ImageRequestParams, Layer, OgcError, WmsClient,
};
use test_utils::{init_tracing, wms_130_document};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAYERS: &str = r#"
      <Layer queryable="1">
        <Name>prism:rainfall</Name>
        <Title>Rainfall</Title>
        <Dimension name="time" units="ISO8601">2021-01-01/2021-01-03/P1D</Dimension>
      </Layer>"#;

fn capabilities(server: &MockServer) -> String {
    let endpoint = format!("{}/geoserver/wms", server.uri());
    wms_130_document(&endpoint, "Mock", "EPSG:3857", LAYERS)
}

#[tokio::test]
async fn test_capabilities_fetched_once() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geoserver/wms"))
        .and(query_param("request", "GetCapabilities"))
        .and(query_param("service", "WMS"))
        .and(query_param("version", "1.3.0"))
        .and(header("user-agent", "prism-tests/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(capabilities(&server), "text/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        user_agent: "prism-tests/1.0".to_string(),
        ..ClientConfig::default()
    };
    let client = WmsClient::from_config(format!("{}/geoserver/wms", server.uri()), config).unwrap();

    assert_eq!(client.get_layer_ids().await.unwrap(), vec!["prism:rainfall"]);
    let layer = client.get_layer("rainfall").await.unwrap();
    assert_eq!(
        layer.get_layer_dates().unwrap(),
        vec!["2021-01-01", "2021-01-02", "2021-01-03"]
    );
    assert_eq!(client.fetch_state(), FetchState::Ready);
}

#[tokio::test]
async fn test_get_image() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("request", "GetCapabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(capabilities(&server), "text/xml"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geoserver/wms"))
        .and(query_param("request", "GetMap"))
        .and(query_param("layers", "prism:rainfall"))
        .and(query_param("time", "2021-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89u8, b'P', b'N', b'G'], "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&ClientConfig::default()).unwrap());
    let client = WmsClient::new(format!("{}/geoserver/wms", server.uri()), fetcher).unwrap();
    let layer = client.get_layer("prism:rainfall").await.unwrap();

    let params = ImageRequestParams::new([0.0, 0.0, 10.0, 10.0], 128, 128).with_time("2021-01-02");
    let image = layer.get_image(&params).await.unwrap();
    assert_eq!(image.content_type.as_deref(), Some("image/png"));
    assert_eq!(&image.bytes[..], &[0x89u8, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_server_error() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = WmsClient::from_config(server.uri(), ClientConfig::default()).unwrap();
    let err = client.get_layer_ids().await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(err.is_retryable());

    // Memoized: the second call does not reach the server
    assert!(client.get_layer_ids().await.is_err());
}

#[tokio::test]
async fn test_connection_refused() {
    init_tracing();
    let fetcher = HttpFetcher::new(&ClientConfig::default()).unwrap();
    let err = fetcher.fetch("http://127.0.0.1:9/wms").await.unwrap_err();
    assert!(matches!(err, OgcError::Transport(_)));
}
