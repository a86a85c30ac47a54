use std::path::Path;

use log::debug;

use crate::errors::*;
use crate::options::OpenOptions;
use crate::vector::DataSource;
use crate::vector::memory::{
    geojson_files, has_geojson_extension, MemoryDataSource, GEOJSON_DRIVER_NAME,
};

/// A data source opened by [`open`], tagged with the driver family that
/// produced it.
#[derive(Debug)]
pub enum OpenedSource {
    Memory(MemoryDataSource),
    #[cfg(feature = "gdal")]
    Gdal(crate::vector::ogr::Dataset),
}

impl OpenedSource {
    /// Short name of the driver that opened the source.
    pub fn driver_name(&self) -> String {
        match self {
            OpenedSource::Memory(ds) => ds.driver_name(),
            #[cfg(feature = "gdal")]
            OpenedSource::Gdal(ds) => ds.driver_name(),
        }
    }

    /// Name of the source as known to its driver.
    pub fn description(&self) -> String {
        match self {
            OpenedSource::Memory(ds) => ds.description(),
            #[cfg(feature = "gdal")]
            OpenedSource::Gdal(ds) => ds.description(),
        }
    }
}

/// Names of every driver able to open a data source, in probing order.
pub fn driver_names() -> Vec<String> {
    #[allow(unused_mut)]
    let mut names = vec![GEOJSON_DRIVER_NAME.to_string()];
    #[cfg(feature = "gdal")]
    names.extend(crate::vector::ogr::vector_driver_names());
    names
}

fn driver_allowed(options: &OpenOptions, driver: &str) -> bool {
    options
        .allowed_drivers
        .map_or(true, |allowed| allowed.iter().any(|d| d.eq_ignore_ascii_case(driver)))
}

/// Whether the in-memory driver recognizes `path`: a GeoJSON file, or a
/// directory holding at least one.
fn is_geojson_source(path: &Path) -> bool {
    if path.is_dir() {
        geojson_files(path).is_ok_and(|files| !files.is_empty())
    } else {
        path.is_file() && has_geojson_extension(path)
    }
}

/// Opens the data source at `path` with the first driver that accepts it.
///
/// GeoJSON files and directories of them are served by the in-memory
/// driver; other paths go to GDAL when the `gdal` feature is enabled. A
/// driver refusing update access reports [`InfoError::ReadOnlyDriver`] so
/// callers can retry read-only. Every other failure is an
/// [`InfoError::OpenFailure`].
pub fn open<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<OpenedSource> {
    let path = path.as_ref();
    let open_failure = || InfoError::OpenFailure {
        path: path.to_path_buf(),
        drivers: driver_names(),
    };

    if driver_allowed(&options, GEOJSON_DRIVER_NAME) && is_geojson_source(path) {
        debug!("Trying driver {GEOJSON_DRIVER_NAME} for {}", path.display());
        return match MemoryDataSource::open(path, &options) {
            Ok(ds) => Ok(OpenedSource::Memory(ds)),
            Err(e @ InfoError::ReadOnlyDriver { .. }) => Err(e),
            Err(e) => {
                debug!("{GEOJSON_DRIVER_NAME} could not open {}: {e}", path.display());
                Err(open_failure())
            }
        };
    }

    #[cfg(feature = "gdal")]
    {
        match crate::vector::ogr::Dataset::open_ex(path, &options) {
            Ok(dataset) => return Ok(OpenedSource::Gdal(dataset)),
            Err(e) => debug!("GDAL could not open {}: {e}", path.display()),
        }
    }

    Err(open_failure())
}
