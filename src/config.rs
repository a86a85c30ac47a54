//! Run configuration
//!
//! Everything a report run needs is gathered once into a
//! [`RunConfiguration`] and passed by reference to the report engine, which
//! never modifies it.
//!
//! ```
//! use ogrinfo::config::{GeometryDisplay, RunConfiguration, ReportFormat};
//!
//! let config = RunConfiguration {
//!     list_all: true,
//!     format: "xml".parse().unwrap(),
//!     ..RunConfiguration::new("fixtures/roads.geojson")
//! };
//! assert_eq!(config.format, ReportFormat::XmlTree);
//! assert_eq!(config.display.geometry, GeometryDisplay::Full);
//! ```

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{InfoError, Result};
use crate::options::NameValueList;
use crate::vector::sql::Dialect;
use crate::vector::Geometry;

/// Output representation of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// The classic `ogrinfo` text layout.
    #[default]
    PlainText,
    /// One XML document per layer.
    XmlTree,
    /// Declared but not available; selecting it fails before any output.
    Json,
}

impl FromStr for ReportFormat {
    type Err = InfoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plaintext" | "gdal" => Ok(ReportFormat::PlainText),
            "xml" | "xmltree" => Ok(ReportFormat::XmlTree),
            "json" => Ok(ReportFormat::Json),
            _ => Err(InfoError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl Display for ReportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReportFormat::PlainText => "PlainText",
            ReportFormat::XmlTree => "XmlTree",
            ReportFormat::Json => "Json",
        })
    }
}

/// How feature geometries are printed in text reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryDisplay {
    /// Full WKT.
    #[default]
    Full,
    /// Geometry type and point counts.
    Summary,
    /// Nothing.
    Suppressed,
}

/// Per-feature display switches, the `DISPLAY_*` options of `-fields=` and `-geom=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub fields: bool,
    pub geometry: GeometryDisplay,
    pub style: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            fields: true,
            geometry: GeometryDisplay::Full,
            style: true,
        }
    }
}

impl DisplayOptions {
    /// Reads `DISPLAY_FIELDS`, `DISPLAY_GEOMETRY` and `DISPLAY_STYLE`.
    ///
    /// `DISPLAY_GEOMETRY` is `SUMMARY`, a false boolean, or anything else for
    /// full WKT.
    pub fn from_options(options: &NameValueList) -> DisplayOptions {
        let geometry = match options.fetch_name_value("DISPLAY_GEOMETRY") {
            Some(value) if value.eq_ignore_ascii_case("SUMMARY") => GeometryDisplay::Summary,
            Some(_) if !options.fetch_bool("DISPLAY_GEOMETRY", true) => {
                GeometryDisplay::Suppressed
            }
            _ => GeometryDisplay::Full,
        };
        DisplayOptions {
            fields: options.fetch_bool("DISPLAY_FIELDS", true),
            geometry,
            style: options.fetch_bool("DISPLAY_STYLE", true),
        }
    }
}

/// Settings of one report run.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Data source to open.
    pub datasource: PathBuf,
    /// Layers to report on, all of them when empty and `list_all` is set.
    pub layers: Vec<String>,
    /// Report on every layer instead of listing them.
    pub list_all: bool,
    /// Do not try to open the data source for update first.
    pub read_only: bool,
    /// Drivers allowed to open the data source, any driver when empty.
    pub allowed_drivers: Vec<String>,
    pub verbose: bool,
    /// Print layer headers only.
    pub summary_only: bool,
    /// Dump only the feature with this id.
    pub fetch_fid: Option<i64>,
    pub display: DisplayOptions,
    /// Number of times the layer reports are produced.
    pub repeat_count: u32,
    pub format: ReportFormat,
    /// Restricted WHERE clause installed on each layer.
    pub attribute_filter: Option<String>,
    /// Rectangle built from `-spat`.
    pub spatial_filter: Option<Geometry>,
    /// Geometry field the spatial filter applies to, the first one when `None`.
    pub geometry_field: Option<String>,
    /// Statement whose result set is reported instead of the layers.
    pub sql: Option<String>,
    pub dialect: Dialect,
}

impl RunConfiguration {
    /// A configuration with `ogrinfo`'s defaults: verbose, full display, one pass.
    pub fn new<P: Into<PathBuf>>(datasource: P) -> RunConfiguration {
        RunConfiguration {
            datasource: datasource.into(),
            layers: Vec::new(),
            list_all: false,
            read_only: false,
            allowed_drivers: Vec::new(),
            verbose: true,
            summary_only: false,
            fetch_fid: None,
            display: DisplayOptions::default(),
            repeat_count: 1,
            format: ReportFormat::PlainText,
            attribute_filter: None,
            spatial_filter: None,
            geometry_field: None,
            sql: None,
            dialect: Dialect::DEFAULT,
        }
    }
}
