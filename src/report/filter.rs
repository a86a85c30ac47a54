//! Installs the attribute and spatial predicates of a run on a layer.

use std::io::Write;

use log::debug;

use crate::errors::*;
use crate::vector::{Geometry, LayerAccess};

/// Narrows the features `layer` yields.
///
/// The attribute filter is installed first; an expression the layer rejects
/// is fatal and reported as [`FilterError::InvalidAttributeExpression`]. The
/// spatial filter goes on the geometry field called `geometry_field_name`, or
/// on the first geometry field when no name is given. An unknown field name
/// only produces a warning on `diagnostics` and leaves the layer unfiltered
/// spatially. Layers without geometry ignore the spatial filter.
pub fn apply<L: LayerAccess + ?Sized>(
    layer: &mut L,
    attribute_filter: Option<&str>,
    spatial_filter: Option<&Geometry>,
    geometry_field_name: Option<&str>,
    diagnostics: &mut dyn Write,
) -> Result<()> {
    if let Some(expression) = attribute_filter {
        layer
            .set_attribute_filter(expression)
            .map_err(|e| match e {
                InfoError::Filter(e) => e,
                other => FilterError::InvalidAttributeExpression {
                    expression: expression.to_string(),
                    reason: other.to_string(),
                },
            })?;
    }

    let Some(geometry) = spatial_filter else {
        return Ok(());
    };
    match geometry_field_name {
        Some(name) => match layer.defn().geom_field_index(name) {
            Ok(index) => layer.set_geom_field_spatial_filter(index, geometry)?,
            Err(_) => writeln!(diagnostics, "WARNING: Cannot find geometry field {name}.")?,
        },
        None if layer.defn().geom_field_count() == 0 => {
            debug!("{}: no geometry field, spatial filter ignored", layer.name());
        }
        None => layer.set_spatial_filter(geometry)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use geo_types::point;

    use super::*;
    use crate::vector::memory::MemoryLayer;
    use crate::vector::{Defn, FieldDefn, FieldType, FieldValue, GeomFieldDefn, GeometryType};

    fn parcels() -> MemoryLayer {
        let defn = Defn::new(
            vec![FieldDefn::new("owner", FieldType::String)],
            vec![
                GeomFieldDefn::new("geom", GeometryType::Point),
                GeomFieldDefn::new("label", GeometryType::Point),
            ],
        );
        let mut layer = MemoryLayer::new("parcels", defn);
        for (owner, x) in [("Smith", 1.0), ("Jones", 2.0), ("Smith", 50.0)] {
            let mut feature = layer.new_feature();
            feature
                .set_field(0, FieldValue::StringValue(owner.to_string()))
                .unwrap();
            feature.set_geometry(0, point!(x: x, y: x).into()).unwrap();
            feature
                .set_geometry(1, point!(x: x + 100.0, y: x).into())
                .unwrap();
            layer.add_feature(feature).unwrap();
        }
        layer
    }

    fn fids(layer: &mut MemoryLayer) -> Vec<i64> {
        layer.reset_feature_reading();
        layer.features().filter_map(|f| f.fid()).collect()
    }

    #[test]
    fn test_no_filters() {
        let mut layer = parcels();
        let mut diagnostics = Vec::new();
        apply(&mut layer, None, None, None, &mut diagnostics).unwrap();
        assert_eq!(fids(&mut layer), vec![0, 1, 2]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_expression_is_fatal() {
        let mut layer = parcels();
        let err = apply(&mut layer, Some("owner = "), None, None, &mut io::sink()).unwrap_err();
        match err {
            InfoError::Filter(FilterError::InvalidAttributeExpression { expression, .. }) => {
                assert_eq!(expression, "owner = ")
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_spatial_filter_defaults_to_first_field() {
        let mut layer = parcels();
        let bbox = Geometry::bbox(0.0, 0.0, 10.0, 10.0);
        apply(&mut layer, None, Some(&bbox), None, &mut io::sink()).unwrap();
        assert_eq!(fids(&mut layer), vec![0, 1]);
    }

    #[test]
    fn test_spatial_filter_on_named_field() {
        let mut layer = parcels();
        let bbox = Geometry::bbox(0.0, 0.0, 10.0, 10.0);
        apply(&mut layer, None, Some(&bbox), Some("label"), &mut io::sink()).unwrap();
        assert!(fids(&mut layer).is_empty());
    }

    #[test]
    fn test_unknown_geometry_field_warns() {
        let mut layer = parcels();
        let bbox = Geometry::bbox(0.0, 0.0, 10.0, 10.0);
        let mut diagnostics = Vec::new();
        apply(&mut layer, None, Some(&bbox), Some("nope"), &mut diagnostics).unwrap();
        assert_eq!(
            String::from_utf8(diagnostics).unwrap(),
            "WARNING: Cannot find geometry field nope.\n"
        );
        assert_eq!(fids(&mut layer), vec![0, 1, 2]);
    }

    #[test]
    fn test_filters_are_monotonic() {
        let bbox = Geometry::bbox(0.0, 0.0, 10.0, 10.0);
        let where_clause = "owner = 'Smith'";

        let mut attribute_only = parcels();
        apply(&mut attribute_only, Some(where_clause), None, None, &mut io::sink()).unwrap();
        let mut spatial_only = parcels();
        apply(&mut spatial_only, None, Some(&bbox), None, &mut io::sink()).unwrap();
        let mut both = parcels();
        apply(&mut both, Some(where_clause), Some(&bbox), None, &mut io::sink()).unwrap();

        let attribute_fids = fids(&mut attribute_only);
        let spatial_fids = fids(&mut spatial_only);
        let both_fids = fids(&mut both);
        assert_eq!(both_fids, vec![0]);
        assert!(both_fids.iter().all(|fid| attribute_fids.contains(fid)));
        assert!(both_fids.iter().all(|fid| spatial_fids.contains(fid)));
    }

    #[test]
    fn test_layer_without_geometry() {
        let mut layer = MemoryLayer::new("plain", Defn::default());
        let bbox = Geometry::bbox(0.0, 0.0, 1.0, 1.0);
        apply(&mut layer, None, Some(&bbox), None, &mut io::sink()).unwrap();
    }
}
