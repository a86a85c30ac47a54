use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use geojson::feature::Id;
use geojson::GeoJson;
use log::{debug, warn};
use serde_json::Value;

use crate::errors::*;
use crate::spatial_ref::SpatialRef;
use crate::vector::memory::MemoryLayer;
use crate::vector::{
    Defn, FieldDefn, FieldType, FieldValue, GeomFieldDefn, Geometry, GeometryType,
};

pub const DRIVER_NAME: &str = "GeoJSON";

pub(crate) fn has_geojson_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
}

/// GeoJSON files directly inside `dir`, sorted by path.
pub(crate) fn geojson_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_geojson_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Loads a GeoJSON document as a single layer.
///
/// The layer is named after the collection's `name` member, or the file
/// stem. Attribute types are inferred from the property values of all
/// features; integer feature ids become FIDs when they are unique.
pub(super) fn load_layer(path: &Path) -> Result<MemoryLayer> {
    let text = std::fs::read_to_string(path)?;
    let document: GeoJson = text.parse().map_err(|source| InfoError::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (name, features, crs) = match document {
        GeoJson::FeatureCollection(collection) => {
            let members = collection.foreign_members.unwrap_or_default();
            let name = members
                .get("name")
                .and_then(Value::as_str)
                .map_or(stem, str::to_string);
            (name, collection.features, members.get("crs").cloned())
        }
        GeoJson::Feature(feature) => (stem, vec![feature], None),
        GeoJson::Geometry(geometry) => (stem, vec![geojson::Feature::from(geometry)], None),
    };

    build_layer(path, &name, features, crs.as_ref())
}

fn build_layer(
    path: &Path,
    name: &str,
    features: Vec<geojson::Feature>,
    crs: Option<&Value>,
) -> Result<MemoryLayer> {
    let mut fields: Vec<(String, Option<FieldType>)> = Vec::new();
    for properties in features.iter().filter_map(|f| f.properties.as_ref()) {
        for (key, value) in properties {
            let value_type = value_type(value);
            match fields.iter_mut().find(|(name, _)| name == key) {
                Some((_, current)) => {
                    *current = match (*current, value_type) {
                        (Some(a), Some(b)) => Some(merge_types(a, b)),
                        (a, b) => a.or(b),
                    }
                }
                None => fields.push((key.clone(), value_type)),
            }
        }
    }

    let mut geometries = Vec::with_capacity(features.len());
    let mut geometry_type = GeometryType::None;
    for feature in &features {
        let geometry = match &feature.geometry {
            Some(geometry) => {
                let geometry: geo_types::Geometry<f64> =
                    geometry.clone().try_into().map_err(|source| InfoError::GeoJson {
                        path: path.to_path_buf(),
                        source: Box::new(source),
                    })?;
                let geometry = Geometry::from(geometry);
                geometry_type = geometry_type.merge(geometry.geometry_type());
                Some(geometry)
            }
            None => None,
        };
        geometries.push(geometry);
    }

    let field_defns: Vec<FieldDefn> = fields
        .iter()
        .map(|(name, ty)| FieldDefn::new(name, ty.unwrap_or(FieldType::String)))
        .collect();
    let mut geom_fields = Vec::new();
    if geometry_type != GeometryType::None {
        let mut geom_field = GeomFieldDefn::new("", geometry_type);
        if let Some(srs) = spatial_ref_from_crs(crs) {
            geom_field = geom_field.with_spatial_ref(srs);
        }
        geom_fields.push(geom_field);
    }
    let defn = Defn::new(field_defns, geom_fields);

    let fids = unique_integer_ids(&features);
    let mut layer = MemoryLayer::new(name, defn);
    for (index, (feature, geometry)) in features.iter().zip(geometries).enumerate() {
        let mut record = layer.new_feature();
        record.set_fid(Some(fids.as_ref().map_or(index as i64, |ids| ids[index])));
        if let Some(properties) = &feature.properties {
            for (field_index, (field_name, ty)) in fields.iter().enumerate() {
                match properties.get(field_name) {
                    None => {}
                    Some(Value::Null) => record.set_field_null(field_index)?,
                    Some(value) => {
                        let ty = ty.unwrap_or(FieldType::String);
                        record.set_field(field_index, to_field_value(value, ty))?
                    }
                }
            }
        }
        if let Some(geometry) = geometry {
            record.set_geometry(0, geometry)?;
        }
        layer.add_feature(record)?;
    }
    debug!(
        "Loaded layer {name}: {} features, {} fields, geometry {geometry_type}",
        features.len(),
        fields.len()
    );
    Ok(layer)
}

fn unique_integer_ids(features: &[geojson::Feature]) -> Option<Vec<i64>> {
    let ids: Vec<i64> = features
        .iter()
        .map(|f| match &f.id {
            Some(Id::Number(n)) => n.as_i64(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    let mut seen = HashSet::new();
    ids.iter().all(|id| seen.insert(*id)).then_some(ids)
}

/// Spatial reference from the legacy `crs` member. Missing means WGS 84,
/// an explicit `null` means unknown.
fn spatial_ref_from_crs(crs: Option<&Value>) -> Option<SpatialRef> {
    let crs = match crs {
        None => return SpatialRef::from_epsg(4326).ok(),
        Some(Value::Null) => return None,
        Some(crs) => crs,
    };
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str);
    match name.map(SpatialRef::from_definition) {
        Some(Ok(srs)) => Some(srs),
        Some(Err(e)) => {
            warn!("Ignoring crs member: {e}");
            None
        }
        None => {
            warn!("Ignoring crs member without a name: {crs}");
            None
        }
    }
}

fn value_type(value: &Value) -> Option<FieldType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(FieldType::Integer),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => FieldType::Integer,
            Some(_) => FieldType::Integer64,
            None => FieldType::Real,
        }),
        Value::String(s) => Some(if parse_date(s).is_some() {
            FieldType::Date
        } else if parse_time(s).is_some() {
            FieldType::Time
        } else if parse_datetime(s).is_some() {
            FieldType::DateTime
        } else {
            FieldType::String
        }),
        Value::Array(items) => {
            let types: Vec<FieldType> = items.iter().filter_map(value_type).collect();
            if types.is_empty() || types.len() != items.len() {
                return Some(FieldType::String);
            }
            let merged = types[1..]
                .iter()
                .fold(types[0], |acc, t| merge_types(acc, *t));
            Some(match merged {
                FieldType::Integer => FieldType::IntegerList,
                FieldType::Integer64 => FieldType::Integer64List,
                FieldType::Real => FieldType::RealList,
                _ if items.iter().all(Value::is_string) => FieldType::StringList,
                _ => FieldType::String,
            })
        }
        Value::Object(_) => Some(FieldType::String),
    }
}

fn merge_types(a: FieldType, b: FieldType) -> FieldType {
    use FieldType::*;
    match (a, b) {
        (a, b) if a == b => a,
        (Integer, Integer64) | (Integer64, Integer) => Integer64,
        (Integer | Integer64, Real) | (Real, Integer | Integer64) => Real,
        (IntegerList, Integer64List) | (Integer64List, IntegerList) => Integer64List,
        (IntegerList | Integer64List, RealList) | (RealList, IntegerList | Integer64List) => {
            RealList
        }
        (Date, DateTime) | (DateTime, Date) => DateTime,
        _ => String,
    }
}

fn to_field_value(value: &Value, field_type: FieldType) -> FieldValue {
    let converted = match (field_type, value) {
        (FieldType::Integer, Value::Bool(b)) => Some(FieldValue::IntegerValue(*b as i32)),
        (FieldType::Integer, Value::Number(n)) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(FieldValue::IntegerValue),
        (FieldType::Integer64, Value::Bool(b)) => Some(FieldValue::Integer64Value(*b as i64)),
        (FieldType::Integer64, Value::Number(n)) => n.as_i64().map(FieldValue::Integer64Value),
        (FieldType::Real, Value::Number(n)) => n.as_f64().map(FieldValue::RealValue),
        (FieldType::Date, Value::String(s)) => parse_date(s).map(FieldValue::DateValue),
        (FieldType::Time, Value::String(s)) => parse_time(s).map(FieldValue::TimeValue),
        (FieldType::DateTime, Value::String(s)) => parse_datetime(s).or_else(|| {
            parse_date(s)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(FieldValue::LocalDateTimeValue)
        }),
        (FieldType::IntegerList, Value::Array(items)) => items
            .iter()
            .map(|v| v.as_i64().and_then(|i| i32::try_from(i).ok()))
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::IntegerListValue),
        (FieldType::Integer64List, Value::Array(items)) => items
            .iter()
            .map(Value::as_i64)
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::Integer64ListValue),
        (FieldType::RealList, Value::Array(items)) => items
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::RealListValue),
        (FieldType::StringList, Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::StringListValue),
        _ => None,
    };
    converted.unwrap_or_else(|| {
        FieldValue::StringValue(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn parse_datetime(s: &str) -> Option<FieldValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(FieldValue::DateTimeValue(dt));
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(FieldValue::LocalDateTimeValue)
}
