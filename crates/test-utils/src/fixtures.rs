//! Common test fixtures for OGC client tests.
//!
//! Small hand-written capabilities documents and the endpoints, layers and
//! extents the tests refer to. Large documents are built by
//! [`crate::generators`].

/// Service endpoints used by the fixtures.
pub mod endpoints {
    /// GeoNode instance publishing hundreds of layers
    pub const GEONODE: &str = "https://geonode.example.org/geoserver/ows";

    /// WFP data cube, advertises its own GetMap endpoint
    pub const DATACUBE: &str = "https://api.earthobservation.vam.wfp.org/ows/";

    /// Legacy WMS 1.1.1 server
    pub const LEGACY_WMS: &str = "https://legacy.example.org/cgi-bin/mapserv";

    /// GeoServer WFS endpoint
    pub const WFS: &str = "https://prism.example.org/geoserver/wfs";
}

/// Common layer identifiers for testing.
pub mod layers {
    /// First layer of the GeoNode document
    pub const GEONODE_FIRST: &str = "geonode:_01_provincias";

    /// Time-enabled data cube layer
    pub const MODIS_INDICES: &str = "ModisIndices";

    /// Data cube layer whose dates are an interval
    pub const MODIS_LST: &str = "ModisLST";

    /// Namespaced WFS feature type
    pub const GDACS_BUFFERS: &str = "prism:col_gdacs_buffers";
}

/// Bounding boxes as `[minX, minY, maxX, maxY]`.
pub mod bbox {
    /// A Web Mercator tile over South-East Asia
    pub const MODIS_TILE_3857: [f64; 4] = [
        11140585.476,
        2273030.927,
        11273725.735,
        2391878.588,
    ];

    /// Global bounding box in EPSG:4326
    pub const GLOBAL: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

    /// Colombia in EPSG:4326
    pub const COLOMBIA: [f64; 4] = [-79.0, -4.2, -66.8, 12.5];

    /// Invalid bbox (min > max)
    pub const INVALID: [f64; 4] = [10.0, 10.0, 5.0, 5.0];
}

/// Number of layer ids in the GeoNode document.
pub const GEONODE_LAYER_COUNT: usize = 659;

/// Number of time values advertised by `ModisIndices`.
pub const MODIS_DATE_COUNT: usize = 488;

/// WMS 1.1.1 document: `SRS`, `LatLonBoundingBox` and the
/// `Dimension`/`Extent` split for time.
pub const WMS_111_CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE WMT_MS_Capabilities SYSTEM "http://schemas.opengis.net/wms/1.1.1/WMS_MS_Capabilities.dtd">
<WMT_MS_Capabilities version="1.1.1">
  <Service>
    <Name>OGC:WMS</Name>
    <Title>Legacy rainfall server</Title>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>application/vnd.ogc.wms_xml</Format>
        <DCPType><HTTP><Get>
          <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="https://legacy.example.org/cgi-bin/mapserv?map=/maps/rain.map&amp;"/>
        </Get></HTTP></DCPType>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
        <DCPType><HTTP><Get>
          <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="https://legacy.example.org/cgi-bin/mapserv?map=/maps/rain.map&amp;"/>
        </Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Exception>
      <Format>application/vnd.ogc.se_xml</Format>
    </Exception>
    <Layer>
      <Title>Rainfall</Title>
      <SRS>EPSG:4326</SRS>
      <SRS>EPSG:3857</SRS>
      <LatLonBoundingBox minx="-180" miny="-50" maxx="180" maxy="50"/>
      <Layer queryable="1">
        <Name>chirps:dekad</Name>
        <Title>CHIRPS dekadal rainfall</Title>
        <Abstract></Abstract>
        <Dimension name="time" units="ISO8601"/>
        <Extent name="time" default="2021-01-21" nearestValue="0">2021-01-01,2021-01-11,2021-01-21</Extent>
      </Layer>
      <Layer queryable="0">
        <Name>admin_boundaries</Name>
        <Title>Administrative boundaries</Title>
        <LatLonBoundingBox minx="92.1" miny="9.5" maxx="101.2" maxy="28.6"/>
      </Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>
"#;

/// WFS 2.0.0 document with an OWS operations section.
pub const WFS_CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities version="2.0.0"
    xmlns:wfs="http://www.opengis.net/wfs/2.0"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    xmlns:prism="https://prism.example.org">
  <ows:ServiceIdentification>
    <ows:Title>PRISM features</ows:Title>
    <ows:ServiceType>WFS</ows:ServiceType>
    <ows:ServiceTypeVersion>2.0.0</ows:ServiceTypeVersion>
  </ows:ServiceIdentification>
  <ows:OperationsMetadata>
    <ows:Operation name="GetCapabilities">
      <ows:DCP><ows:HTTP>
        <ows:Get xlink:href="https://prism.example.org/geoserver/wfs"/>
      </ows:HTTP></ows:DCP>
    </ows:Operation>
    <ows:Operation name="GetFeature">
      <ows:DCP><ows:HTTP>
        <ows:Get xlink:href="https://prism.example.org/geoserver/prism/wfs"/>
        <ows:Post xlink:href="https://prism.example.org/geoserver/prism/wfs"/>
      </ows:HTTP></ows:DCP>
    </ows:Operation>
  </ows:OperationsMetadata>
  <FeatureTypeList>
    <FeatureType>
      <Name>prism:col_gdacs_buffers</Name>
      <Title>GDACS cyclone buffers</Title>
      <DefaultCRS>urn:ogc:def:crs:EPSG::4326</DefaultCRS>
      <ows:WGS84BoundingBox>
        <ows:LowerCorner>-79.0 -4.2</ows:LowerCorner>
        <ows:UpperCorner>-66.8 12.5</ows:UpperCorner>
      </ows:WGS84BoundingBox>
    </FeatureType>
    <FeatureType>
      <Name>prism:mmr_admin_boundaries</Name>
      <Title>Myanmar admin boundaries</Title>
      <DefaultCRS>urn:ogc:def:crs:EPSG::4326</DefaultCRS>
    </FeatureType>
  </FeatureTypeList>
</wfs:WFS_Capabilities>
"#;

/// WMS exception report, as returned for an unknown layer.
pub const SERVICE_EXCEPTION_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc">
  <ServiceException code="LayerNotDefined" locator="layers">
    Could not find layer geonode:missing
  </ServiceException>
</ServiceExceptionReport>
"#;

/// A GeoJSON feature collection with two features.
pub const FEATURE_COLLECTION: &str = r#"{
  "type": "FeatureCollection",
  "numberReturned": 2,
  "features": [
    {"type": "Feature", "id": "col_gdacs_buffers.1", "properties": {"alert": "orange"}, "geometry": {"type": "Point", "coordinates": [-74.1, 4.6]}},
    {"type": "Feature", "id": "col_gdacs_buffers.2", "properties": {"alert": "red"}, "geometry": {"type": "Point", "coordinates": [-75.5, 6.2]}}
  ]
}"#;
