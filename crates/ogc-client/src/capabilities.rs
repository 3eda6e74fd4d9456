//! Capabilities documents: typed layer entries, operation URLs and
//! exception reports.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use ogc_common::{Extent, OgcError, OgcResult, TimeDimension};

use crate::xml::{attribute_of, find_tag_by_name, find_tag_by_path, find_tags_by_path, xml_error};

/// Which element of a capabilities document describes a queryable layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// WMS `Layer`
    Map,
    /// WFS `FeatureType`
    Feature,
}

impl LayerKind {
    fn element(&self) -> &'static [u8] {
        match self {
            LayerKind::Map => b"Layer",
            LayerKind::Feature => b"FeatureType",
        }
    }
}

/// One layer (or feature type) as declared in a capabilities document.
///
/// Absent child elements are `None`; present but empty ones are `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub name: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    /// Supported CRS codes, including those inherited from parent layers
    pub crs: Vec<String>,
    /// Geographic (lon/lat) extent, inherited when not declared
    pub geographic_bbox: Option<Extent>,
    /// Time dimension, inherited when not declared
    pub time: Option<TimeDimension>,
    /// Index of the enclosing layer in document order
    pub parent: Option<usize>,
}

/// A fetched capabilities document and its parsed layers.
///
/// Cheap to clone; every layer handed out by a client shares the same text.
#[derive(Debug, Clone)]
pub struct CapabilitiesDocument {
    url: Arc<str>,
    xml: Arc<str>,
    version: Option<Arc<str>>,
    layers: Arc<[LayerEntry]>,
}

impl CapabilitiesDocument {
    /// Parse `xml`, fetched from `url`, as a document of the given kind.
    pub fn parse(url: &str, xml: String, kind: LayerKind) -> OgcResult<Self> {
        if let Some(err) = service_exception(&xml)? {
            return Err(err);
        }
        let version = crate::xml::get_root_attribute(&xml, "version")?;
        let layers = parse_layers(&xml, kind)?;

        Ok(Self {
            url: url.into(),
            xml: xml.into(),
            version: version.map(Into::into),
            layers: layers.into(),
        })
    }

    /// URL the document was fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Version announced by the server on the document root.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.layers
    }

    /// Named layers in document order, duplicates included.
    pub fn layer_ids(&self) -> Vec<String> {
        self.named_layers().map(|l| l.name.clone().unwrap_or_default()).collect()
    }

    /// Titles aligned by index with [`CapabilitiesDocument::layer_ids`];
    /// a layer without a title is listed by its name.
    pub fn layer_titles(&self) -> Vec<String> {
        self.named_layers()
            .map(|l| l.title.clone().or_else(|| l.name.clone()).unwrap_or_default())
            .collect()
    }

    /// First named layer called exactly `name`.
    pub fn layer(&self, name: &str) -> Option<&LayerEntry> {
        self.named_layers().find(|l| l.name.as_deref() == Some(name))
    }

    /// Request URL advertised for `operation`, if any.
    pub fn capability_url(&self, operation: &str) -> OgcResult<Option<String>> {
        find_and_parse_capability_url(&self.xml, operation)
    }

    fn named_layers(&self) -> impl Iterator<Item = &LayerEntry> {
        self.layers.iter().filter(|l| l.name.is_some())
    }
}

/// Find the request URL the server advertises for `capability`.
///
/// WMS documents are walked along `Capability > Request > {capability}` to
/// the first `OnlineResource`. OWS-style documents (WFS 1.1+) are searched
/// under `OperationsMetadata` for the matching `Operation`'s `Get` binding.
/// `None` means the server does not advertise the operation.
pub fn find_and_parse_capability_url(xml: &str, capability: &str) -> OgcResult<Option<String>> {
    if let Some(op) = find_tag_by_path(xml, &["Capability", "Request", capability])? {
        if let Some(resource) = find_tag_by_name(op.inner, "OnlineResource")? {
            return resource.attribute("xlink:href");
        }
        return Ok(None);
    }

    for op in find_tags_by_path(xml, &["ows:OperationsMetadata", "ows:Operation"])? {
        if op.attribute("name")?.as_deref() != Some(capability) {
            continue;
        }
        if let Some(get) = find_tag_by_name(op.inner, "ows:Get")? {
            return get.attribute("xlink:href");
        }
    }

    Ok(None)
}

/// Turn an OGC exception report into an error, if `xml` is one.
///
/// Covers WMS `ServiceExceptionReport` and OWS `ExceptionReport` documents.
pub fn service_exception(xml: &str) -> OgcResult<Option<OgcError>> {
    let mut reader = Reader::from_str(xml);
    let mut in_report = false;
    let mut code: Option<String> = None;
    let mut message = String::new();
    let mut capturing = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if !in_report => {
                let local = e.local_name();
                if local.as_ref() != b"ServiceExceptionReport" && local.as_ref() != b"ExceptionReport"
                {
                    return Ok(None);
                }
                in_report = true;
            }
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ServiceException" | b"Exception" if code.is_none() => {
                    code = Some(exception_code(&e)?);
                    capturing = true;
                }
                b"ExceptionText" => capturing = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.local_name().as_ref(), b"ServiceException" | b"Exception")
                    && code.is_none()
                {
                    code = Some(exception_code(&e)?);
                }
            }
            Ok(Event::Text(t)) if capturing => {
                let text = t.unescape().map_err(|e| OgcError::Xml(e.to_string()))?;
                message.push_str(text.trim());
            }
            Ok(Event::CData(t)) if capturing => {
                message.push_str(String::from_utf8_lossy(&t).trim());
            }
            Ok(Event::End(e)) => {
                if matches!(
                    e.local_name().as_ref(),
                    b"ServiceException" | b"Exception" | b"ExceptionText"
                ) && code.is_some()
                {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    if !in_report {
        return Ok(None);
    }
    Ok(Some(OgcError::ServiceException {
        code: code.unwrap_or_else(|| "NoApplicableCode".to_string()),
        message,
    }))
}

fn exception_code(e: &BytesStart<'_>) -> OgcResult<String> {
    Ok(attribute_of(e, "code")?
        .or(attribute_of(e, "exceptionCode")?)
        .unwrap_or_else(|| "NoApplicableCode".to_string()))
}

/// Child element whose text is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Title,
    Abstract,
    Crs,
    TimeValues,
    BboxWest,
    BboxEast,
    BboxSouth,
    BboxNorth,
    LowerCorner,
    UpperCorner,
}

#[derive(Debug, Default)]
struct PartialBbox {
    west: Option<f64>,
    east: Option<f64>,
    south: Option<f64>,
    north: Option<f64>,
}

impl PartialBbox {
    fn finish(&self) -> Option<Extent> {
        Some(Extent::new(self.west?, self.south?, self.east?, self.north?))
    }
}

/// A layer element that has been opened but not yet closed.
struct OpenLayer {
    index: usize,
    depth: usize,
    bbox: PartialBbox,
    /// Depth of an open bbox child whose children carry the corners
    bbox_depth: Option<usize>,
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Parse every layer element in document order, resolving inheritance.
pub fn parse_layers(xml: &str, kind: LayerKind) -> OgcResult<Vec<LayerEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries: Vec<LayerEntry> = Vec::new();
    let mut open: Vec<OpenLayer> = Vec::new();
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                capture = start_element(&e, depth, kind, &mut entries, &mut open)?.or(capture);
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                // Self-closing: a layer opens and closes at once, a captured
                // field is present but empty.
                let opened_layer = e.local_name().as_ref() == kind.element();
                if let Some(empty) = start_element(&e, depth, kind, &mut entries, &mut open)? {
                    finish_capture(empty, &mut entries, &mut open)?;
                }
                if opened_layer {
                    close_layer(&mut entries, &mut open);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(c) = capture.as_mut() {
                    let text = t.unescape().map_err(|e| OgcError::Xml(e.to_string()))?;
                    c.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    if let Some(done) = capture.take() {
                        finish_capture(done, &mut entries, &mut open)?;
                    }
                }
                if let Some(layer) = open.last_mut() {
                    if layer.bbox_depth == Some(depth) {
                        layer.bbox_depth = None;
                    }
                }
                if open.last().is_some_and(|l| l.depth == depth) {
                    close_layer(&mut entries, &mut open);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    inherit(&mut entries);
    Ok(entries)
}

/// Handle an opening tag; returns a capture when its text is wanted.
fn start_element(
    e: &BytesStart<'_>,
    depth: usize,
    kind: LayerKind,
    entries: &mut Vec<LayerEntry>,
    open: &mut Vec<OpenLayer>,
) -> OgcResult<Option<Capture>> {
    let local = e.local_name();
    let local = local.as_ref();

    if local == kind.element() {
        entries.push(LayerEntry {
            parent: open.last().map(|l| l.index),
            ..LayerEntry::default()
        });
        open.push(OpenLayer {
            index: entries.len() - 1,
            depth,
            bbox: PartialBbox::default(),
            bbox_depth: None,
        });
        return Ok(None);
    }

    let Some(layer) = open.last_mut() else {
        return Ok(None);
    };
    let capture = |field| Some(Capture { field, depth, text: String::new() });

    // Grandchildren of the layer inside a geographic bbox element
    if layer.bbox_depth.is_some_and(|d| d + 1 == depth) {
        let field = match local {
            b"westBoundLongitude" => Field::BboxWest,
            b"eastBoundLongitude" => Field::BboxEast,
            b"southBoundLatitude" => Field::BboxSouth,
            b"northBoundLatitude" => Field::BboxNorth,
            b"LowerCorner" => Field::LowerCorner,
            b"UpperCorner" => Field::UpperCorner,
            _ => return Ok(None),
        };
        return Ok(capture(field));
    }

    if depth != layer.depth + 1 {
        return Ok(None);
    }

    let entry = &mut entries[layer.index];
    let field = match local {
        b"Name" => Field::Name,
        b"Title" => Field::Title,
        b"Abstract" => Field::Abstract,
        b"CRS" | b"SRS" | b"DefaultSRS" | b"DefaultCRS" | b"OtherSRS" | b"OtherCRS" => Field::Crs,
        b"EX_GeographicBoundingBox" | b"WGS84BoundingBox" => {
            layer.bbox_depth = Some(depth);
            return Ok(None);
        }
        b"LatLonBoundingBox" => {
            // WMS 1.1.1 carries the corners as attributes
            let coord = |name: &str| -> OgcResult<Option<f64>> {
                attribute_of(e, name)?.map(|v| parse_coord(&v)).transpose()
            };
            layer.bbox = PartialBbox {
                west: coord("minx")?,
                south: coord("miny")?,
                east: coord("maxx")?,
                north: coord("maxy")?,
            };
            return Ok(None);
        }
        b"Dimension" | b"Extent" => {
            let is_time = attribute_of(e, "name")?
                .map(|n| n.eq_ignore_ascii_case("time"))
                .unwrap_or(false);
            if !is_time {
                return Ok(None);
            }
            let default = attribute_of(e, "default")?;
            let time = entry.time.get_or_insert_with(|| TimeDimension::new("", None));
            if default.is_some() {
                time.default = default;
            }
            Field::TimeValues
        }
        _ => return Ok(None),
    };

    Ok(capture(field))
}

fn finish_capture(
    capture: Capture,
    entries: &mut [LayerEntry],
    open: &mut [OpenLayer],
) -> OgcResult<()> {
    let Some(layer) = open.last_mut() else {
        return Ok(());
    };
    let entry = &mut entries[layer.index];
    let text = capture.text.trim().to_string();

    match capture.field {
        Field::Name => entry.name = Some(text),
        Field::Title => entry.title = Some(text),
        Field::Abstract => entry.abstract_text = Some(text),
        Field::Crs => {
            if !text.is_empty() && !entry.crs.contains(&text) {
                entry.crs.push(text);
            }
        }
        Field::TimeValues => {
            // WMS 1.1.1 declares an empty Dimension and lists values in Extent
            if !text.is_empty() {
                if let Some(time) = entry.time.as_mut() {
                    time.values = text;
                }
            }
        }
        Field::BboxWest => layer.bbox.west = Some(parse_coord(&text)?),
        Field::BboxEast => layer.bbox.east = Some(parse_coord(&text)?),
        Field::BboxSouth => layer.bbox.south = Some(parse_coord(&text)?),
        Field::BboxNorth => layer.bbox.north = Some(parse_coord(&text)?),
        Field::LowerCorner => {
            let (x, y) = parse_corner(&text)?;
            layer.bbox.west = Some(x);
            layer.bbox.south = Some(y);
        }
        Field::UpperCorner => {
            let (x, y) = parse_corner(&text)?;
            layer.bbox.east = Some(x);
            layer.bbox.north = Some(y);
        }
    }
    Ok(())
}

fn close_layer(entries: &mut [LayerEntry], open: &mut Vec<OpenLayer>) {
    if let Some(layer) = open.pop() {
        let entry = &mut entries[layer.index];
        if entry.geographic_bbox.is_none() {
            entry.geographic_bbox = layer.bbox.finish();
        }
        // A time dimension declared without any values is not usable
        if entry.time.as_ref().is_some_and(|t| t.values.trim().is_empty()) {
            entry.time = None;
        }
    }
}

/// Apply WMS inheritance: CRS lists accumulate, bbox and time are taken from
/// the nearest ancestor that declares them. Parents precede children in
/// document order, so one forward pass suffices.
fn inherit(entries: &mut [LayerEntry]) {
    for i in 0..entries.len() {
        let Some(parent) = entries[i].parent else {
            continue;
        };
        let (parent_crs, parent_bbox, parent_time) = {
            let p = &entries[parent];
            (p.crs.clone(), p.geographic_bbox, p.time.clone())
        };

        let entry = &mut entries[i];
        for crs in parent_crs {
            if !entry.crs.contains(&crs) {
                entry.crs.push(crs);
            }
        }
        if entry.geographic_bbox.is_none() {
            entry.geographic_bbox = parent_bbox;
        }
        if entry.time.is_none() {
            entry.time = parent_time;
        }
    }
}

fn parse_coord(s: &str) -> OgcResult<f64> {
    s.trim()
        .parse()
        .map_err(|_| OgcError::Xml(format!("invalid coordinate '{}'", s)))
}

fn parse_corner(s: &str) -> OgcResult<(f64, f64)> {
    let mut parts = s.split_whitespace().map(parse_coord);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(x), Some(y), None) => Ok((x?, y?)),
        _ => Err(OgcError::Xml(format!("invalid corner '{}'", s))),
    }
}
