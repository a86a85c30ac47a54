use std::path::PathBuf;

use thiserror::Error;

#[cfg(feature = "gdal")]
use gdal_sys::{CPLErr, OGRErr};

/// Errors raised while opening a data source or producing a layer report.
#[derive(Debug, Error)]
pub enum InfoError {
    #[error("Unable to open datasource `{}' with the following drivers: {}", path.display(), drivers.join(", "))]
    OpenFailure {
        path: PathBuf,
        drivers: Vec<String>,
    },
    #[error("Driver '{driver}' does not support update access")]
    ReadOnlyDriver { driver: &'static str },
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("Couldn't fetch requested layer {name}!")]
    LayerNotFound { name: String },
    #[error("Couldn't fetch advertised layer {index}!")]
    LayerIndexOutOfRange { index: usize },
    #[error("Output format '{format}' is not supported in this build")]
    UnsupportedFormat { format: String },
    #[error("SQL dialect '{dialect}' is not supported by driver '{driver}'")]
    UnsupportedDialect { dialect: String, driver: String },
    #[error("Invalid SQL statement '{statement}': {reason}")]
    InvalidSql { statement: String, reason: String },
    #[error("Extent is not available for geometry field {field_index}")]
    ExtentUnavailable { field_index: usize },
    #[error("Invalid field name '{field_name}' used on method {method_name}")]
    InvalidFieldName {
        field_name: String,
        method_name: &'static str,
    },
    #[error("Invalid field index {index} used on method {method_name}")]
    InvalidFieldIndex {
        index: usize,
        method_name: &'static str,
    },
    #[error("Bad argument: {0}")]
    BadArgument(String),
    #[error("Unable to parse GeoJSON in {}: {source}", path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "gdal")]
    #[error("FfiNulError")]
    FfiNulError(#[from] std::ffi::NulError),
    #[cfg(feature = "gdal")]
    #[error("CPL error class: '{class:?}', error number: '{number}', error msg: '{msg}'")]
    CplError {
        class: CPLErr::Type,
        number: i32,
        msg: String,
    },
    #[cfg(feature = "gdal")]
    #[error("GDAL method '{method_name}' returned a NULL pointer. Error msg: '{msg}'")]
    NullPointer {
        method_name: &'static str,
        msg: String,
    },
    #[cfg(feature = "gdal")]
    #[error("OGR method '{method_name}' returned error: '{err:?}'")]
    OgrError {
        err: OGRErr::Type,
        method_name: &'static str,
    },
}

/// Failure to install a filter on a layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("SetAttributeFilter({expression}) failed: {reason}")]
    InvalidAttributeExpression { expression: String, reason: String },
}

pub type Result<T> = std::result::Result<T, InfoError>;
