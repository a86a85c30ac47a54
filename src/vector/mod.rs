//! Vector Data
//!
//! Data sources hold layers, layers hold features. Everything the report
//! engine reads goes through the [`DataSource`] and [`LayerAccess`] traits,
//! implemented by the in-memory driver (always available) and, with the
//! `gdal` cargo feature, by wrappers over the OGR C API.
//!
//! ## Reading
//!
//! ```
//! use ogrinfo::options::OpenOptions;
//! use ogrinfo::vector::memory::MemoryDataSource;
//! use ogrinfo::vector::{DataSource, LayerAccess};
//!
//! let mut dataset =
//!     MemoryDataSource::open("fixtures/roads.geojson", &OpenOptions::default()).unwrap();
//! let mut layer = dataset.layer(0).unwrap();
//! let highway = layer.defn().field_index("highway").unwrap();
//! for feature in layer.features() {
//!     let highway_field = feature.field(highway).unwrap();
//!     let geometry = feature.geometry(0).unwrap();
//!     println!("{:?} {}", highway_field, geometry.wkt());
//! }
//! ```

pub use dataset::DataSource;
pub use defn::{Defn, FieldDefn, GeomFieldDefn};
pub use driver::{driver_names, open, OpenedSource};
pub use feature::{Feature, FieldContent, FieldValue};
pub use geometry::{Envelope, Geometry};
pub use layer::{FeatureIterator, LayerAccess};
pub use types::{FieldType, GeometryType};

mod dataset;
mod defn;
mod driver;
pub(crate) mod expr;
mod feature;
mod geometry;
mod layer;
pub mod memory;
#[cfg(feature = "gdal")]
pub mod ogr;
pub mod sql;
mod types;

/// Feature id reported for features without one.
pub const NULL_FID: i64 = -1;

#[cfg(test)]
mod vector_tests;
