//! Vector data source reports in the manner of GDAL's `ogrinfo`.
//!
//! A report run lists the layers of a data source or, for the selected
//! layers, prints their schema, extent and spatial reference followed by
//! their features, optionally narrowed by an attribute and a spatial filter.
//! Output is the classic `ogrinfo` text layout or one XML document per layer.
//!
//! GeoJSON files and directories of them are read by a pure-Rust in-memory
//! driver. With the `gdal` cargo feature, every other OGR-supported format
//! is opened through `gdal-sys`.
//!
//! ## Use
//!
//! ```
//! use ogrinfo::config::{ReportFormat, RunConfiguration};
//!
//! let config = RunConfiguration {
//!     layers: vec!["parcels".to_string()],
//!     attribute_filter: Some("owner = 'Smith'".to_string()),
//!     verbose: false,
//!     ..RunConfiguration::new("fixtures/parcels.geojson")
//! };
//! let mut report = Vec::new();
//! ogrinfo::report::run(&config, &mut report, &mut std::io::stderr()).unwrap();
//!
//! let report = String::from_utf8(report).unwrap();
//! assert!(report.starts_with("\nLayer name: parcels\nOGRFeature(parcels):10\n"));
//! assert!(!report.contains("Jones"));
//! ```

pub mod config;
pub mod errors;
pub mod options;
pub mod report;
pub mod spatial_ref;
pub mod utils;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_utils;
