//! Format-neutral description of a layer's schema and extent.

use log::debug;

use crate::spatial_ref::SpatialRef;
use crate::vector::{Envelope, FieldDefn, GeometryType, LayerAccess};

/// Text printed in place of a missing spatial reference.
pub const UNKNOWN_SRS: &str = "(unknown)";

/// Everything a report prints about a layer before its features.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMetadata {
    pub name: String,
    /// Attribute fields in schema order.
    pub fields: Vec<FieldDefn>,
    /// Geometry fields in schema order.
    pub geometry_fields: Vec<GeometryFieldMetadata>,
    /// Verbose header, `None` in quiet mode.
    pub details: Option<LayerDetails>,
}

/// Name, type and, in verbose mode, extent and spatial reference of a
/// geometry field.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFieldMetadata {
    pub name: String,
    pub geometry_type: GeometryType,
    /// `None` when the extent could not be computed or in quiet mode.
    pub extent: Option<Envelope>,
    /// Pretty WKT, or [`UNKNOWN_SRS`].
    pub spatial_ref: String,
}

/// Layer-level values of the verbose header.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDetails {
    pub geometry_type: GeometryType,
    /// `None` when the layer cannot count its features.
    pub feature_count: Option<u64>,
    pub extent: Option<Envelope>,
    /// Pretty WKT, or [`UNKNOWN_SRS`].
    pub spatial_ref: String,
    pub fid_column: Option<String>,
    pub geometry_column: Option<String>,
}

fn srs_text(srs: Option<SpatialRef>) -> String {
    srs.map_or_else(|| UNKNOWN_SRS.to_string(), |srs| srs.to_pretty_wkt())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Reads the metadata of `layer` without changing its schema.
///
/// Quiet extraction skips everything that can be expensive: counting
/// features and computing extents may scan the whole layer.
pub fn extract<L: LayerAccess + ?Sized>(layer: &L, verbose: bool) -> LayerMetadata {
    let defn = layer.defn();
    let geometry_fields = defn
        .geom_fields()
        .enumerate()
        .map(|(index, field)| GeometryFieldMetadata {
            name: field.name().to_string(),
            geometry_type: field.geometry_type(),
            extent: if verbose {
                layer
                    .geom_field_extent(index)
                    .map_err(|e| debug!("{}: {e}", layer.name()))
                    .ok()
            } else {
                None
            },
            spatial_ref: srs_text(layer.geom_field_spatial_ref(index)),
        })
        .collect();

    let details = verbose.then(|| LayerDetails {
        geometry_type: layer.geometry_type(),
        feature_count: layer.feature_count(),
        extent: layer.get_extent().ok(),
        spatial_ref: srs_text(layer.spatial_ref()),
        fid_column: non_empty(layer.fid_column()),
        geometry_column: non_empty(layer.geometry_column()),
    });

    LayerMetadata {
        name: layer.name(),
        fields: defn.fields().cloned().collect(),
        geometry_fields,
        details,
    }
}
