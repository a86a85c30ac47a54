use std::ffi::{c_int, CString};
use std::marker::PhantomData;
use std::ptr::null_mut;

use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
use gdal_sys::{self, GDALDatasetH, OGREnvelope, OGRErr, OGRFeatureDefnH, OGRFeatureH, OGRLayerH};
use log::{debug, warn};

use crate::errors::*;
use crate::spatial_ref::SpatialRef;
use crate::utils::{_last_cpl_err_msg, _string, _string_array};
use crate::vector::ogr::geometry::{geometry_from_c, OwnedGeometry};
use crate::vector::ogr::{field_type_from_c, geometry_type_from_c, Dataset};
use crate::vector::{
    Defn, Envelope, Feature, FieldDefn, FieldType, FieldValue, GeomFieldDefn, Geometry,
    GeometryType, LayerAccess, NULL_FID,
};

/// A layer of a [`Dataset`], or the result set of an SQL statement.
///
/// The schema is copied when the layer is fetched. A result set is released
/// back to its dataset when dropped.
#[derive(Debug)]
pub struct Layer<'a> {
    c_layer: OGRLayerH,
    defn: Defn,
    result_set_of: Option<GDALDatasetH>,
    phantom: PhantomData<&'a mut Dataset>,
}

impl Layer<'_> {
    /// # Safety
    /// `c_layer` must be a valid layer handle owned by a dataset that
    /// outlives the returned value. `result_set_of` is that dataset when the
    /// layer came from `GDALDatasetExecuteSQL`.
    pub(crate) unsafe fn from_c_layer(
        c_layer: OGRLayerH,
        result_set_of: Option<GDALDatasetH>,
    ) -> Self {
        let defn = defn_from_c(gdal_sys::OGR_L_GetLayerDefn(c_layer));
        Layer {
            c_layer,
            defn,
            result_set_of,
            phantom: PhantomData,
        }
    }

    pub fn c_layer(&self) -> OGRLayerH {
        self.c_layer
    }

    fn read_feature(&self, c_feature: OGRFeatureH) -> Result<Feature> {
        let mut feature = Feature::new(&self.defn);
        let fid = unsafe { gdal_sys::OGR_F_GetFID(c_feature) };
        feature.set_fid((fid != NULL_FID).then_some(fid));

        for (index, field) in self.defn.fields().enumerate() {
            let c_index = c_index(index)?;
            if unsafe { gdal_sys::OGR_F_IsFieldSet(c_feature, c_index) } == 0 {
                continue;
            }
            if unsafe { gdal_sys::OGR_F_IsFieldNull(c_feature, c_index) } != 0 {
                feature.set_field_null(index)?;
                continue;
            }
            match unsafe { field_value(c_feature, c_index, field.field_type()) } {
                Some(value) => feature.set_field(index, value)?,
                None => feature.set_field_null(index)?,
            }
        }

        for index in 0..self.defn.geom_field_count() {
            let c_geometry = unsafe { gdal_sys::OGR_F_GetGeomFieldRef(c_feature, c_index(index)?) };
            if let Some(geometry) = unsafe { geometry_from_c(c_geometry) } {
                feature.set_geometry(index, geometry)?;
            }
        }

        let style = unsafe { gdal_sys::OGR_F_GetStyleString(c_feature) };
        if !style.is_null() {
            feature.set_style_string(&_string(style));
        }
        Ok(feature)
    }

    /// Converts and destroys `c_feature`.
    fn take_feature(&self, c_feature: OGRFeatureH) -> Option<Feature> {
        let feature = self.read_feature(c_feature);
        unsafe { gdal_sys::OGR_F_Destroy(c_feature) };
        match feature {
            Ok(feature) => Some(feature),
            Err(e) => {
                warn!("Skipping unreadable feature of {}: {e}", self.name());
                None
            }
        }
    }
}

impl Drop for Layer<'_> {
    fn drop(&mut self) {
        if let Some(c_dataset) = self.result_set_of {
            unsafe { gdal_sys::GDALDatasetReleaseResultSet(c_dataset, self.c_layer) };
        }
    }
}

impl LayerAccess for Layer<'_> {
    fn name(&self) -> String {
        _string(unsafe { gdal_sys::OGR_L_GetName(self.c_layer) })
    }

    fn defn(&self) -> &Defn {
        &self.defn
    }

    fn geometry_type(&self) -> GeometryType {
        geometry_type_from_c(unsafe { gdal_sys::OGR_L_GetGeomType(self.c_layer) })
    }

    fn fid_column(&self) -> String {
        _string(unsafe { gdal_sys::OGR_L_GetFIDColumn(self.c_layer) })
    }

    fn geometry_column(&self) -> String {
        _string(unsafe { gdal_sys::OGR_L_GetGeometryColumn(self.c_layer) })
    }

    fn feature_count(&self) -> Option<u64> {
        let count = unsafe { gdal_sys::OGR_L_GetFeatureCount(self.c_layer, 1) };
        u64::try_from(count).ok()
    }

    fn geom_field_extent(&self, index: usize) -> Result<Envelope> {
        let mut envelope = OGREnvelope {
            MinX: 0.0,
            MaxX: 0.0,
            MinY: 0.0,
            MaxY: 0.0,
        };
        let rv = unsafe {
            gdal_sys::OGR_L_GetExtentEx(self.c_layer, c_index(index)?, &mut envelope, 1)
        };
        if rv != OGRErr::OGRERR_NONE {
            debug!("OGR_L_GetExtentEx returned {rv} for field {index}");
            return Err(InfoError::ExtentUnavailable { field_index: index });
        }
        Ok(Envelope::new(
            envelope.MinX,
            envelope.MinY,
            envelope.MaxX,
            envelope.MaxY,
        ))
    }

    fn set_attribute_filter(&mut self, query: &str) -> Result<()> {
        let c_str = CString::new(query)?;
        unsafe { gdal_sys::CPLErrorReset() };
        let rv = unsafe { gdal_sys::OGR_L_SetAttributeFilter(self.c_layer, c_str.as_ptr()) };
        if rv != OGRErr::OGRERR_NONE {
            return Err(FilterError::InvalidAttributeExpression {
                expression: query.to_string(),
                reason: _last_cpl_err_msg(),
            }
            .into());
        }
        Ok(())
    }

    fn clear_attribute_filter(&mut self) {
        unsafe { gdal_sys::OGR_L_SetAttributeFilter(self.c_layer, std::ptr::null()) };
    }

    fn set_geom_field_spatial_filter(&mut self, index: usize, geometry: &Geometry) -> Result<()> {
        let c_geometry = OwnedGeometry::from_geometry(geometry)?;
        unsafe {
            gdal_sys::OGR_L_SetSpatialFilterEx(self.c_layer, c_index(index)?, c_geometry.c_geometry())
        };
        Ok(())
    }

    fn clear_spatial_filter(&mut self) {
        unsafe { gdal_sys::OGR_L_SetSpatialFilter(self.c_layer, null_mut()) };
    }

    fn reset_feature_reading(&mut self) {
        unsafe { gdal_sys::OGR_L_ResetReading(self.c_layer) };
    }

    fn next_feature(&mut self) -> Option<Feature> {
        loop {
            let c_feature = unsafe { gdal_sys::OGR_L_GetNextFeature(self.c_layer) };
            if c_feature.is_null() {
                return None;
            }
            if let Some(feature) = self.take_feature(c_feature) {
                return Some(feature);
            }
        }
    }

    fn feature(&mut self, fid: i64) -> Option<Feature> {
        let c_feature = unsafe { gdal_sys::OGR_L_GetFeature(self.c_layer, fid) };
        if c_feature.is_null() {
            return None;
        }
        self.take_feature(c_feature)
    }
}

fn c_index(index: usize) -> Result<c_int> {
    c_int::try_from(index).map_err(|_| InfoError::InvalidFieldIndex {
        index,
        method_name: "c_index",
    })
}

/// Copies an OGR feature definition into a [`Defn`].
unsafe fn defn_from_c(c_defn: OGRFeatureDefnH) -> Defn {
    let field_count = gdal_sys::OGR_FD_GetFieldCount(c_defn).max(0);
    let fields = (0..field_count)
        .map(|index| {
            let c_field = gdal_sys::OGR_FD_GetFieldDefn(c_defn, index);
            let field_type = field_type_from_c(gdal_sys::OGR_Fld_GetType(c_field));
            FieldDefn::new(&_string(gdal_sys::OGR_Fld_GetNameRef(c_field)), field_type)
                .with_width(gdal_sys::OGR_Fld_GetWidth(c_field))
                .with_precision(gdal_sys::OGR_Fld_GetPrecision(c_field))
        })
        .collect();

    let geom_field_count = gdal_sys::OGR_FD_GetGeomFieldCount(c_defn).max(0);
    let geom_fields = (0..geom_field_count)
        .map(|index| {
            let c_field = gdal_sys::OGR_FD_GetGeomFieldDefn(c_defn, index);
            let geometry_type = geometry_type_from_c(gdal_sys::OGR_GFld_GetType(c_field));
            let field = GeomFieldDefn::new(&_string(gdal_sys::OGR_GFld_GetNameRef(c_field)), geometry_type);
            match spatial_ref_from_c(gdal_sys::OGR_GFld_GetSpatialRef(c_field)) {
                Some(spatial_ref) => field.with_spatial_ref(spatial_ref),
                None => field,
            }
        })
        .collect();

    Defn::new(fields, geom_fields)
}

unsafe fn spatial_ref_from_c(c_srs: gdal_sys::OGRSpatialReferenceH) -> Option<SpatialRef> {
    if c_srs.is_null() {
        return None;
    }
    let mut c_wkt = null_mut();
    let rv = gdal_sys::OSRExportToWkt(c_srs, &mut c_wkt);
    let wkt = _string(c_wkt);
    gdal_sys::VSIFree(c_wkt.cast());
    if rv != OGRErr::OGRERR_NONE {
        debug!("OSRExportToWkt returned {rv}");
        return None;
    }
    match SpatialRef::from_wkt(&wkt) {
        Ok(spatial_ref) => Some(spatial_ref),
        Err(e) => {
            debug!("Ignoring unparsable spatial reference: {e}");
            None
        }
    }
}

/// Reads the set, non-null field at `c_index` as `field_type`.
unsafe fn field_value(
    c_feature: OGRFeatureH,
    c_index: c_int,
    field_type: FieldType,
) -> Option<FieldValue> {
    let mut length: c_int = 0;
    let value = match field_type {
        FieldType::Integer => {
            FieldValue::IntegerValue(gdal_sys::OGR_F_GetFieldAsInteger(c_feature, c_index))
        }
        FieldType::Integer64 => {
            FieldValue::Integer64Value(gdal_sys::OGR_F_GetFieldAsInteger64(c_feature, c_index))
        }
        FieldType::Real => {
            FieldValue::RealValue(gdal_sys::OGR_F_GetFieldAsDouble(c_feature, c_index))
        }
        FieldType::String => {
            FieldValue::StringValue(_string(gdal_sys::OGR_F_GetFieldAsString(c_feature, c_index)))
        }
        FieldType::Binary => {
            let ptr = gdal_sys::OGR_F_GetFieldAsBinary(c_feature, c_index, &mut length);
            FieldValue::BinaryValue(slice(ptr, length).to_vec())
        }
        FieldType::IntegerList => {
            let ptr = gdal_sys::OGR_F_GetFieldAsIntegerList(c_feature, c_index, &mut length);
            FieldValue::IntegerListValue(slice(ptr, length).to_vec())
        }
        FieldType::Integer64List => {
            let ptr = gdal_sys::OGR_F_GetFieldAsInteger64List(c_feature, c_index, &mut length);
            FieldValue::Integer64ListValue(slice(ptr, length).to_vec())
        }
        FieldType::RealList => {
            let ptr = gdal_sys::OGR_F_GetFieldAsDoubleList(c_feature, c_index, &mut length);
            FieldValue::RealListValue(slice(ptr, length).to_vec())
        }
        FieldType::StringList => FieldValue::StringListValue(_string_array(
            gdal_sys::OGR_F_GetFieldAsStringList(c_feature, c_index),
        )),
        FieldType::Date | FieldType::Time | FieldType::DateTime => {
            return date_time_value(c_feature, c_index, field_type)
        }
    };
    Some(value)
}

unsafe fn slice<'a, T>(ptr: *const T, length: c_int) -> &'a [T] {
    if ptr.is_null() || length <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(ptr, length as usize)
}

/// Reads a date, time or date-time field. OGR time zone flags are 0 for
/// unknown, 1 for local time and 100 plus quarter hours for an offset from UTC.
unsafe fn date_time_value(
    c_feature: OGRFeatureH,
    c_index: c_int,
    field_type: FieldType,
) -> Option<FieldValue> {
    let (mut year, mut month, mut day, mut hour, mut minute, mut tz_flag) = (0, 0, 0, 0, 0, 0);
    let mut second = 0.0f32;
    let rv = gdal_sys::OGR_F_GetFieldAsDateTimeEx(
        c_feature,
        c_index,
        &mut year,
        &mut month,
        &mut day,
        &mut hour,
        &mut minute,
        &mut second,
        &mut tz_flag,
    );
    if rv == 0 {
        return None;
    }

    let whole_seconds = second.trunc() as u32;
    let millis = ((second.fract() * 1000.0).round() as u32).min(999);
    let time = NaiveTime::from_hms_milli_opt(hour as u32, minute as u32, whole_seconds, millis)?;
    if field_type == FieldType::Time {
        return Some(FieldValue::TimeValue(time));
    }
    let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?;
    if field_type == FieldType::Date {
        return Some(FieldValue::DateValue(date));
    }

    let datetime = date.and_time(time);
    if tz_flag < 100 {
        return Some(FieldValue::LocalDateTimeValue(datetime));
    }
    let offset = FixedOffset::east_opt((tz_flag - 100) * 15 * 60)?;
    offset
        .from_local_datetime(&datetime)
        .single()
        .map(FieldValue::DateTimeValue)
}
