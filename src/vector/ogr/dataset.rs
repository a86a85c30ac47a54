use std::ffi::{c_char, c_int, CString};
use std::path::Path;
use std::ptr::null_mut;

use gdal_sys::{self, CPLErr, GDALDatasetH};
use log::debug;

use crate::errors::*;
use crate::options::{OpenFlags, OpenOptions};
use crate::utils::{_last_cpl_err, _last_null_pointer_err, _path_to_c_string, _string};
use crate::vector::ogr::geometry::OwnedGeometry;
use crate::vector::ogr::{Layer, _register_drivers};
use crate::vector::sql::Dialect;
use crate::vector::{DataSource, Geometry};

/// A vector data source opened through `GDALOpenEx`, closed when dropped.
#[derive(Debug)]
pub struct Dataset {
    c_dataset: GDALDatasetH,
}

impl Dataset {
    /// Opens the data source at `path` with the vector drivers of GDAL.
    ///
    /// `options.allowed_drivers` restricts the drivers tried, in order.
    pub fn open_ex(path: &Path, options: &OpenOptions) -> Result<Dataset> {
        _register_drivers();
        let c_filename = _path_to_c_string(path)?;
        let c_open_flags = (options.open_flags | OpenFlags::VECTOR).bits();

        // all CStrings need to live until the end of `GDALOpenEx`
        let c_allowed_drivers = options
            .allowed_drivers
            .unwrap_or_default()
            .iter()
            .map(|&driver| CString::new(driver))
            .collect::<std::result::Result<Vec<CString>, _>>()?;
        let mut c_drivers_ptrs: Vec<*const c_char> =
            c_allowed_drivers.iter().map(|s| s.as_ptr()).collect();
        c_drivers_ptrs.push(std::ptr::null());
        let c_drivers_ptr = if options.allowed_drivers.is_some() {
            c_drivers_ptrs.as_ptr()
        } else {
            std::ptr::null()
        };

        let c_dataset = unsafe {
            gdal_sys::GDALOpenEx(
                c_filename.as_ptr(),
                c_open_flags,
                c_drivers_ptr,
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        if c_dataset.is_null() {
            return Err(_last_null_pointer_err("GDALOpenEx"));
        }
        Ok(Dataset { c_dataset })
    }

    pub fn c_dataset(&self) -> GDALDatasetH {
        self.c_dataset
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        unsafe { gdal_sys::GDALClose(self.c_dataset) };
    }
}

impl DataSource for Dataset {
    type Layer<'a> = Layer<'a>;
    type ResultSet<'a> = Layer<'a>;

    fn description(&self) -> String {
        _string(unsafe { gdal_sys::GDALGetDescription(self.c_dataset) })
    }

    fn driver_name(&self) -> String {
        let c_driver = unsafe { gdal_sys::GDALGetDatasetDriver(self.c_dataset) };
        if c_driver.is_null() {
            return String::new();
        }
        _string(unsafe { gdal_sys::GDALGetDriverShortName(c_driver) })
    }

    fn layer_count(&self) -> usize {
        let count = unsafe { gdal_sys::GDALDatasetGetLayerCount(self.c_dataset) };
        count.max(0) as usize
    }

    fn layer(&mut self, index: usize) -> Result<Layer<'_>> {
        let c_index =
            c_int::try_from(index).map_err(|_| InfoError::LayerIndexOutOfRange { index })?;
        let c_layer = unsafe { gdal_sys::GDALDatasetGetLayer(self.c_dataset, c_index) };
        if c_layer.is_null() {
            return Err(InfoError::LayerIndexOutOfRange { index });
        }
        Ok(unsafe { Layer::from_c_layer(c_layer, None) })
    }

    fn layer_by_name(&mut self, name: &str) -> Result<Layer<'_>> {
        let c_name = CString::new(name)?;
        let c_layer = unsafe { gdal_sys::GDALDatasetGetLayerByName(self.c_dataset, c_name.as_ptr()) };
        if c_layer.is_null() {
            return Err(InfoError::LayerNotFound {
                name: name.to_string(),
            });
        }
        Ok(unsafe { Layer::from_c_layer(c_layer, None) })
    }

    fn execute_sql(
        &mut self,
        query: &str,
        spatial_filter: Option<&Geometry>,
        dialect: Dialect,
    ) -> Result<Option<Layer<'_>>> {
        let c_query = CString::new(query)?;
        let c_dialect = dialect.name().map(CString::new).transpose()?;
        let dialect_ptr = match &c_dialect {
            None => std::ptr::null(),
            Some(d) => d.as_ptr(),
        };
        let filter = spatial_filter.map(OwnedGeometry::from_geometry).transpose()?;
        let filter_geom = filter.as_ref().map_or(null_mut(), |g| g.c_geometry());

        unsafe { gdal_sys::CPLErrorReset() };

        let c_layer = unsafe {
            gdal_sys::GDALDatasetExecuteSQL(self.c_dataset, c_query.as_ptr(), filter_geom, dialect_ptr)
        };

        let cpl_err = unsafe { gdal_sys::CPLGetLastErrorType() };
        if cpl_err != CPLErr::CE_None {
            if !c_layer.is_null() {
                unsafe { gdal_sys::GDALDatasetReleaseResultSet(self.c_dataset, c_layer) };
            }
            return Err(_last_cpl_err(cpl_err));
        }

        if c_layer.is_null() {
            debug!("{query}: statement produced no result set");
            return Ok(None);
        }

        Ok(Some(unsafe { Layer::from_c_layer(c_layer, Some(self.c_dataset)) }))
    }
}
