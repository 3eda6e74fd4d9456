//! Generators for large capabilities documents.
//!
//! The documents are deterministic, so tests can assert exact counts,
//! first and last entries.

use chrono::{Duration, NaiveDate};

use crate::fixtures::{endpoints, layers, GEONODE_LAYER_COUNT, MODIS_DATE_COUNT};

/// Layer ids of the GeoNode document, in document order.
///
/// The first id is `geonode:_01_provincias`, the rest are
/// `geonode:layer_001` upwards.
pub fn geonode_layer_ids() -> Vec<String> {
    std::iter::once(layers::GEONODE_FIRST.to_string())
        .chain((1..GEONODE_LAYER_COUNT).map(|i| format!("geonode:layer_{:03}", i)))
        .collect()
}

/// WMS 1.3.0 GeoNode document with [`GEONODE_LAYER_COUNT`] named layers
/// under one unnamed root layer.
pub fn geonode_capabilities() -> String {
    let mut layer_xml = String::new();
    for (i, id) in geonode_layer_ids().iter().enumerate() {
        layer_xml.push_str(&format!(
            r#"
      <Layer queryable="1" opaque="0">
        <Name>{id}</Name>
        <Title>GeoNode layer {i}</Title>
        <Abstract>No abstract provided</Abstract>
        <CRS>EPSG:4326</CRS>
        <EX_GeographicBoundingBox>
          <westBoundLongitude>-73.6</westBoundLongitude>
          <eastBoundLongitude>-53.6</eastBoundLongitude>
          <southBoundLatitude>-55.1</southBoundLatitude>
          <northBoundLatitude>-21.8</northBoundLatitude>
        </EX_GeographicBoundingBox>
        <Style><Name>default</Name><Title>Default</Title></Style>
      </Layer>"#,
            id = id,
            i = i
        ));
    }

    wms_130_document(endpoints::GEONODE, "GeoNode", "EPSG:3857", &layer_xml)
}

/// Dates advertised by `ModisIndices`: every tenth day from 2009-01-01,
/// closed by `2022-07-11`; [`MODIS_DATE_COUNT`] values, ascending.
pub fn modis_dates() -> Vec<String> {
    let start = NaiveDate::from_ymd_opt(2009, 1, 1).expect("valid date");
    let mut dates: Vec<String> = (0..MODIS_DATE_COUNT as i64 - 1)
        .map(|i| (start + Duration::days(10 * i)).format("%Y-%m-%d").to_string())
        .collect();
    dates.push("2022-07-11".to_string());
    dates
}

/// WMS 1.3.0 data cube document whose GetMap endpoint is advertised.
///
/// `ModisIndices` lists its dates out of order and with one duplicate;
/// `ModisLST` declares an interval; `Boundaries` has no time dimension.
pub fn datacube_capabilities() -> String {
    let mut dates = modis_dates();
    // Newest first plus a repeat, as some servers publish them
    dates.reverse();
    dates.push(dates[dates.len() / 2].clone());

    let layer_xml = format!(
        r#"
      <Layer queryable="1">
        <Name>{modis}</Name>
        <Title>MODIS vegetation indices</Title>
        <Abstract>NDVI and EVI composites</Abstract>
        <EX_GeographicBoundingBox>
          <westBoundLongitude>-180</westBoundLongitude>
          <eastBoundLongitude>180</eastBoundLongitude>
          <southBoundLatitude>-60</southBoundLatitude>
          <northBoundLatitude>80</northBoundLatitude>
        </EX_GeographicBoundingBox>
        <Dimension name="time" units="ISO8601" default="2022-07-11">{dates}</Dimension>
      </Layer>
      <Layer queryable="1">
        <Name>{lst}</Name>
        <Title>MODIS land surface temperature</Title>
        <Dimension name="time" units="ISO8601">2020-01-01/2020-03-01/P1M</Dimension>
      </Layer>
      <Layer queryable="0">
        <Name>Boundaries</Name>
        <Title>Boundaries</Title>
      </Layer>"#,
        modis = layers::MODIS_INDICES,
        lst = layers::MODIS_LST,
        dates = dates.join(",")
    );

    wms_130_document(endpoints::DATACUBE, "WFP data cube", "EPSG:3857", &layer_xml)
}

/// Wrap `layer_xml` in a WMS 1.3.0 document advertising `online_resource`
/// for GetCapabilities and GetMap; the root layer declares EPSG:4326 and
/// `root_crs`.
pub fn wms_130_document(online_resource: &str, title: &str, root_crs: &str, layer_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" updateSequence="1"
    xmlns="http://www.opengis.net/wms"
    xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service>
    <Name>WMS</Name>
    <Title>{title}</Title>
    <OnlineResource xlink:type="simple" xlink:href="{url}"/>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>text/xml</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="{url}"/></Get></HTTP></DCPType>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="{url}"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Exception><Format>XML</Format></Exception>
    <Layer>
      <Title>{title}</Title>
      <CRS>EPSG:4326</CRS>
      <CRS>{root_crs}</CRS>{layers}
    </Layer>
  </Capability>
</WMS_Capabilities>
"#,
        title = title,
        url = online_resource,
        root_crs = root_crs,
        layers = layer_xml
    )
}
