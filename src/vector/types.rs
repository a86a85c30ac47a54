use std::fmt::{Display, Formatter};

/// Geometry type of a layer or geometry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    /// Layer without geometry.
    None,
}

impl GeometryType {
    /// Human readable name, as printed in layer headers (`Polygon`, `Multi Line String`, …).
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Unknown => "Unknown (any)",
            GeometryType::Point => "Point",
            GeometryType::LineString => "Line String",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "Multi Point",
            GeometryType::MultiLineString => "Multi Line String",
            GeometryType::MultiPolygon => "Multi Polygon",
            GeometryType::GeometryCollection => "Geometry Collection",
            GeometryType::None => "None",
        }
    }

    /// Upper case keyword used in WKT.
    pub fn wkt_keyword(&self) -> &'static str {
        match self {
            GeometryType::Unknown => "GEOMETRY",
            GeometryType::Point => "POINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPoint => "MULTIPOINT",
            GeometryType::MultiLineString => "MULTILINESTRING",
            GeometryType::MultiPolygon => "MULTIPOLYGON",
            GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryType::None => "NONE",
        }
    }

    /// Smallest type covering both `self` and `other`, used when a layer mixes
    /// geometry types.
    pub fn merge(self, other: GeometryType) -> GeometryType {
        match (self, other) {
            (a, b) if a == b => a,
            (GeometryType::None, b) => b,
            (a, GeometryType::None) => a,
            _ => GeometryType::Unknown,
        }
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Data type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Integer64,
    Real,
    String,
    Date,
    Time,
    DateTime,
    Binary,
    IntegerList,
    Integer64List,
    RealList,
    StringList,
}

impl FieldType {
    /// Name of the type as printed in reports (`Integer`, `String`, …).
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "Integer",
            FieldType::Integer64 => "Integer64",
            FieldType::Real => "Real",
            FieldType::String => "String",
            FieldType::Date => "Date",
            FieldType::Time => "Time",
            FieldType::DateTime => "DateTime",
            FieldType::Binary => "Binary",
            FieldType::IntegerList => "IntegerList",
            FieldType::Integer64List => "Integer64List",
            FieldType::RealList => "RealList",
            FieldType::StringList => "StringList",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Integer64 | FieldType::Real
        )
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_type_names() {
        assert_eq!(GeometryType::Polygon.to_string(), "Polygon");
        assert_eq!(GeometryType::MultiLineString.name(), "Multi Line String");
        assert_eq!(GeometryType::Unknown.name(), "Unknown (any)");
    }

    #[test]
    fn merge_mixed_types() {
        assert_eq!(
            GeometryType::None.merge(GeometryType::Point),
            GeometryType::Point
        );
        assert_eq!(
            GeometryType::Point.merge(GeometryType::Point),
            GeometryType::Point
        );
        assert_eq!(
            GeometryType::Point.merge(GeometryType::Polygon),
            GeometryType::Unknown
        );
    }
}
