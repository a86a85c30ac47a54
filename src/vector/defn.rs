use crate::errors::*;
use crate::spatial_ref::SpatialRef;
use crate::vector::{FieldType, GeometryType};

/// Layer definition
///
/// Defines the attribute and geometry fields available for features in a layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defn {
    fields: Vec<FieldDefn>,
    geom_fields: Vec<GeomFieldDefn>,
}

impl Defn {
    pub fn new(fields: Vec<FieldDefn>, geom_fields: Vec<GeomFieldDefn>) -> Defn {
        Defn {
            fields,
            geom_fields,
        }
    }

    /// Iterate over the field schema of this layer.
    pub fn fields(&self) -> std::slice::Iter<'_, FieldDefn> {
        self.fields.iter()
    }

    /// Iterate over the geometry field schema of this layer.
    pub fn geom_fields(&self) -> std::slice::Iter<'_, GeomFieldDefn> {
        self.geom_fields.iter()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn geom_field_count(&self) -> usize {
        self.geom_fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldDefn> {
        self.fields.get(index)
    }

    pub fn geom_field(&self, index: usize) -> Option<&GeomFieldDefn> {
        self.geom_fields.get(index)
    }

    /// Index of the attribute field called `name` (case-insensitive).
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| InfoError::InvalidFieldName {
                field_name: name.to_string(),
                method_name: "field_index",
            })
    }

    /// Index of the geometry field called `name` (case-insensitive).
    pub fn geom_field_index(&self, name: &str) -> Result<usize> {
        self.geom_fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| InfoError::InvalidFieldName {
                field_name: name.to_string(),
                method_name: "geom_field_index",
            })
    }

    /// Get the geometry type of the first geometry field
    pub fn geometry_type(&self) -> GeometryType {
        self.geom_fields
            .first()
            .map_or(GeometryType::None, |g| g.geometry_type)
    }

    pub fn add_field(&mut self, field: FieldDefn) {
        self.fields.push(field);
    }

    pub fn add_geom_field(&mut self, field: GeomFieldDefn) {
        self.geom_fields.push(field);
    }

    pub(crate) fn geom_field_mut(&mut self, index: usize) -> Option<&mut GeomFieldDefn> {
        self.geom_fields.get_mut(index)
    }
}

/// Definition of an attribute field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefn {
    name: String,
    field_type: FieldType,
    width: i32,
    precision: i32,
}

impl FieldDefn {
    pub fn new(name: &str, field_type: FieldType) -> FieldDefn {
        FieldDefn {
            name: name.to_string(),
            field_type,
            width: 0,
            precision: 0,
        }
    }

    pub fn with_width(mut self, width: i32) -> FieldDefn {
        self.width = width;
        self
    }

    pub fn with_precision(mut self, precision: i32) -> FieldDefn {
        self.precision = precision;
        self
    }

    /// Get the name of this field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data type of this field.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Get the formatting width for this field.
    ///
    /// Zero means no specified width.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Get the formatting precision for this field.
    ///
    /// This should normally be zero for fields of types other than Real.
    pub fn precision(&self) -> i32 {
        self.precision
    }
}

/// Definition of a geometry field.
#[derive(Debug, Clone, PartialEq)]
pub struct GeomFieldDefn {
    name: String,
    geometry_type: GeometryType,
    spatial_ref: Option<SpatialRef>,
}

impl GeomFieldDefn {
    pub fn new(name: &str, geometry_type: GeometryType) -> GeomFieldDefn {
        GeomFieldDefn {
            name: name.to_string(),
            geometry_type,
            spatial_ref: None,
        }
    }

    pub fn with_spatial_ref(mut self, spatial_ref: SpatialRef) -> GeomFieldDefn {
        self.spatial_ref = Some(spatial_ref);
        self
    }

    /// Get the name of this field. May be empty for single-geometry formats.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    pub(crate) fn set_geometry_type(&mut self, geometry_type: GeometryType) {
        self.geometry_type = geometry_type;
    }
}
