//! Common types shared by the OGC client crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod layer;
pub mod time;

pub use bbox::{check_extent, Extent};
pub use crs::{AxisOrder, CrsCode};
pub use error::{OgcError, OgcResult};
pub use layer::{find_layer_id, has_layer_id, parse_name, LayerIdentifier};
pub use time::{IsoPeriod, TimeDimension};
