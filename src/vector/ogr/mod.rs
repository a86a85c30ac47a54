//! OGR backend
//!
//! Wraps the GDAL/OGR C API behind [`DataSource`](crate::vector::DataSource)
//! and [`LayerAccess`](crate::vector::LayerAccess). Schemas, features and
//! geometries are copied into the crate's own types as they are read, so the
//! report engine never touches a C handle.

use std::ffi::c_char;
use std::sync::Once;

use gdal_sys::{self, CPLErr, CPLErrorNum, OGRFieldType, OGRwkbGeometryType};
use log::{debug, error, warn};

use crate::utils::_string;
use crate::vector::{FieldType, GeometryType};

pub use self::dataset::Dataset;
pub use self::layer::Layer;

mod dataset;
mod geometry;
mod layer;

static START: Once = Once::new();

/// Registers the GDAL drivers and routes CPL messages to the `log` facade.
pub(crate) fn _register_drivers() {
    START.call_once(|| unsafe {
        gdal_sys::GDALAllRegister();
        gdal_sys::CPLSetErrorHandler(Some(log_handler));
    });
}

unsafe extern "C" fn log_handler(
    error_type: CPLErr::Type,
    error_num: CPLErrorNum,
    error_msg_ptr: *const c_char,
) {
    let error_msg = _string(error_msg_ptr);
    match error_type {
        CPLErr::CE_None => {}
        CPLErr::CE_Debug => debug!("GDAL: {error_msg}"),
        CPLErr::CE_Warning => warn!("GDAL warning {error_num}: {error_msg}"),
        _ => error!("GDAL error {error_num}: {error_msg}"),
    }
}

/// Short names of the registered GDAL drivers with vector support.
pub fn vector_driver_names() -> Vec<String> {
    _register_drivers();
    let key = c"DCAP_VECTOR";
    let count = unsafe { gdal_sys::GDALGetDriverCount() };
    (0..count)
        .filter_map(|index| {
            let c_driver = unsafe { gdal_sys::GDALGetDriver(index) };
            if c_driver.is_null() {
                return None;
            }
            let capability = unsafe {
                gdal_sys::GDALGetMetadataItem(c_driver, key.as_ptr(), std::ptr::null())
            };
            if capability.is_null() {
                return None;
            }
            Some(_string(unsafe { gdal_sys::GDALGetDriverShortName(c_driver) }))
        })
        .collect()
}

pub(crate) fn field_type_from_c(field_type: OGRFieldType::Type) -> FieldType {
    match field_type {
        OGRFieldType::OFTInteger => FieldType::Integer,
        OGRFieldType::OFTInteger64 => FieldType::Integer64,
        OGRFieldType::OFTReal => FieldType::Real,
        OGRFieldType::OFTDate => FieldType::Date,
        OGRFieldType::OFTTime => FieldType::Time,
        OGRFieldType::OFTDateTime => FieldType::DateTime,
        OGRFieldType::OFTBinary => FieldType::Binary,
        OGRFieldType::OFTIntegerList => FieldType::IntegerList,
        OGRFieldType::OFTInteger64List => FieldType::Integer64List,
        OGRFieldType::OFTRealList => FieldType::RealList,
        OGRFieldType::OFTStringList | OGRFieldType::OFTWideStringList => {
            FieldType::StringList
        }
        _ => FieldType::String,
    }
}

/// Maps an OGR geometry type to the crate's, dropping Z and M dimensions.
pub(crate) fn geometry_type_from_c(geometry_type: OGRwkbGeometryType::Type) -> GeometryType {
    match unsafe { gdal_sys::OGR_GT_Flatten(geometry_type) } {
        OGRwkbGeometryType::wkbNone => GeometryType::None,
        OGRwkbGeometryType::wkbPoint => GeometryType::Point,
        OGRwkbGeometryType::wkbLineString => GeometryType::LineString,
        OGRwkbGeometryType::wkbPolygon => GeometryType::Polygon,
        OGRwkbGeometryType::wkbMultiPoint => GeometryType::MultiPoint,
        OGRwkbGeometryType::wkbMultiLineString => GeometryType::MultiLineString,
        OGRwkbGeometryType::wkbMultiPolygon => GeometryType::MultiPolygon,
        OGRwkbGeometryType::wkbGeometryCollection => GeometryType::GeometryCollection,
        _ => GeometryType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InfoError;
    use crate::options::{OpenFlags, OpenOptions};
    use crate::test_utils::{fixture, TempFixture};
    use crate::vector::{DataSource, FieldValue, Geometry, LayerAccess};

    #[test]
    fn test_vector_drivers_registered() {
        let names = vector_driver_names();
        assert!(names.iter().any(|name| name == "ESRI Shapefile"));
        assert!(!names.iter().any(|name| name == "GTiff"));
    }

    #[test]
    fn test_geometry_type_mapping() {
        assert_eq!(
            geometry_type_from_c(OGRwkbGeometryType::wkbMultiPolygon25D),
            GeometryType::MultiPolygon
        );
        assert_eq!(
            geometry_type_from_c(OGRwkbGeometryType::wkbNone),
            GeometryType::None
        );
        assert_eq!(
            geometry_type_from_c(OGRwkbGeometryType::wkbCircularString),
            GeometryType::Unknown
        );
    }

    #[test]
    fn test_field_type_mapping() {
        assert_eq!(
            field_type_from_c(OGRFieldType::OFTWideString),
            FieldType::String
        );
        assert_eq!(
            field_type_from_c(OGRFieldType::OFTInteger64List),
            FieldType::Integer64List
        );
    }

    #[test]
    fn test_open_with_ogr() {
        let ds = Dataset::open_ex(&fixture("parcels.geojson"), &OpenOptions::default()).unwrap();
        assert_eq!(ds.driver_name(), "GeoJSON");
        assert_eq!(ds.layer_count(), 1);
    }

    #[test]
    fn test_open_missing_with_ogr() {
        let err = Dataset::open_ex(&fixture("nope.shp"), &OpenOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            InfoError::NullPointer {
                method_name: "GDALOpenEx",
                ..
            }
        ));
    }

    #[test]
    fn test_layer_read_through_ogr() {
        let parcels = TempFixture::fixture("parcels.geojson");
        let options = OpenOptions {
            open_flags: OpenFlags::UPDATE | OpenFlags::VECTOR,
            ..OpenOptions::default()
        };
        let mut ds = Dataset::open_ex(parcels.path(), &options).unwrap();
        let mut layer = ds.layer_by_name("parcels").unwrap();
        assert_eq!(layer.geometry_type(), GeometryType::Polygon);
        assert_eq!(layer.feature_count(), Some(3));

        let extent = layer.get_extent().unwrap();
        assert_eq!((extent.min_x, extent.max_y), (0.0, 24.0));

        layer.set_attribute_filter("owner = 'Smith'").unwrap();
        assert_eq!(layer.feature_count(), Some(2));

        layer.clear_attribute_filter();
        layer.set_spatial_filter(&Geometry::bbox(4.5, 0.0, 10.0, 4.0)).unwrap();
        layer.reset_feature_reading();
        let feature = layer.next_feature().unwrap();
        let owner = layer.defn().field_index("owner").unwrap();
        assert_eq!(
            feature.field(owner).unwrap().value(),
            Some(&FieldValue::StringValue("Jones".to_string()))
        );
        assert!(layer.next_feature().is_none());

        layer.set_spatial_filter(&Geometry::bbox(19.0, 19.0, 25.0, 25.0)).unwrap();
        layer.reset_feature_reading();
        let feature = layer.next_feature().unwrap();
        let value = layer.defn().field_index("value").unwrap();
        assert!(feature.field(value).unwrap().is_null());
    }

    #[test]
    fn test_sql_through_ogr() {
        let mut ds = Dataset::open_ex(&fixture("parcels.geojson"), &OpenOptions::default()).unwrap();
        let mut result_set = ds
            .execute_sql("SELECT owner FROM parcels WHERE id > 1", None, Default::default())
            .unwrap()
            .unwrap();
        assert_eq!(result_set.defn().field_count(), 1);
        assert_eq!(result_set.features().count(), 2);
    }

    #[test]
    fn test_bad_attribute_filter_through_ogr() {
        let mut ds = Dataset::open_ex(&fixture("parcels.geojson"), &OpenOptions::default()).unwrap();
        let mut layer = ds.layer(0).unwrap();
        assert!(matches!(
            layer.set_attribute_filter("owner = "),
            Err(InfoError::Filter(_))
        ));
    }
}
