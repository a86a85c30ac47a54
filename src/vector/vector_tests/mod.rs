use crate::options::OpenOptions;
use crate::test_utils::{fixture, TempFixture};
use crate::vector::memory::{MemoryDataSource, MemoryLayer};
use crate::vector::{
    DataSource, Feature, FeatureIterator, FieldType, FieldValue, Geometry, GeometryType,
    LayerAccess,
};
use crate::{assert_near, errors::InfoError};

mod sql;

fn open(name: &str) -> MemoryDataSource {
    MemoryDataSource::open(fixture(name), &OpenOptions::default()).unwrap()
}

fn with_layer<F>(name: &str, f: F)
where
    F: Fn(&mut MemoryLayer),
{
    let mut ds = open(name);
    let layer = ds.layer(0).unwrap();
    f(layer);
}

fn with_features<F>(name: &str, f: F)
where
    F: Fn(FeatureIterator<MemoryLayer>),
{
    with_layer(name, |layer| f(layer.features()));
}

fn with_feature<F>(name: &str, fid: i64, f: F)
where
    F: Fn(Feature),
{
    with_layer(name, |layer| f(layer.feature(fid).unwrap()));
}

#[test]
fn test_layer_count() {
    let ds = open("roads.geojson");
    assert_eq!(ds.layer_count(), 1);
    assert_eq!(ds.driver_name(), "GeoJSON");
}

#[test]
fn test_directory_layers() {
    let mut ds = open("city");
    assert_eq!(ds.layer_count(), 2);
    assert_eq!(ds.layer(0).unwrap().name(), "parks");
    assert_eq!(ds.layer(1).unwrap().name(), "rivers");
    assert!(ds.layer_by_name("RIVERS").is_ok());
    assert!(matches!(
        ds.layer_by_name("lakes"),
        Err(InfoError::LayerNotFound { .. })
    ));
    assert!(matches!(
        ds.layer(2),
        Err(InfoError::LayerIndexOutOfRange { index: 2 })
    ));
}

#[test]
fn test_directory_skips_other_files() {
    let staging = TempFixture::empty("staging");
    std::fs::create_dir(staging.path()).unwrap();
    std::fs::write(staging.path().join("notes.txt"), "not a layer").unwrap();
    let ds = MemoryDataSource::open(staging.path(), &OpenOptions::default()).unwrap();
    assert_eq!(ds.layer_count(), 0);

    std::fs::copy(fixture("roads.geojson"), staging.path().join("roads.geojson")).unwrap();
    let mut ds = MemoryDataSource::open(staging.path(), &OpenOptions::default()).unwrap();
    assert_eq!(ds.layer(0).unwrap().name(), "roads");
}

#[test]
fn test_description_is_the_opened_path() {
    let roads = TempFixture::fixture("roads.geojson");
    let ds = MemoryDataSource::open(roads.path(), &OpenOptions::default()).unwrap();
    assert_eq!(ds.description(), roads.path().display().to_string());
}

#[test]
fn test_layer_get_extent() {
    with_layer("roads.geojson", |layer| {
        let extent = layer.get_extent().unwrap();
        assert_near!(extent.min_x, 0.0);
        assert_near!(extent.max_x, 10.0);
        assert_near!(extent.min_y, 0.0);
        assert_near!(extent.max_y, 8.0);
    });
}

#[test]
fn test_layer_spatial_ref() {
    with_layer("roads.geojson", |layer| {
        let srs = layer.spatial_ref().unwrap();
        assert_eq!(srs.auth_code(), Some(4326));
    });
    with_layer("unknown_crs.geojson", |layer| {
        assert!(layer.spatial_ref().is_none());
    });
}

#[test]
fn test_schema() {
    with_layer("parcels.geojson", |layer| {
        let defn = layer.defn();
        let fields: Vec<_> = defn
            .fields()
            .map(|f| (f.name().to_string(), f.field_type()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("id".to_string(), FieldType::Integer),
                ("owner".to_string(), FieldType::String),
                ("value".to_string(), FieldType::Real),
            ]
        );
        assert_eq!(layer.geometry_type(), GeometryType::Polygon);
        assert_eq!(layer.geometry_column(), "");
    });
    with_layer("city/parks.geojson", |layer| {
        assert_eq!(layer.defn().field(1).unwrap().field_type(), FieldType::Date);
    });
}

#[test]
fn test_feature_count() {
    with_layer("roads.geojson", |layer| {
        assert_eq!(layer.feature_count(), Some(3));
    });
}

#[test]
fn test_feature_ids() {
    with_features("parcels.geojson", |features| {
        let fids: Vec<_> = features.map(|f| f.fid()).collect();
        assert_eq!(fids, vec![Some(10), Some(11), Some(12)]);
    });
    with_features("roads.geojson", |features| {
        let fids: Vec<_> = features.map(|f| f.fid()).collect();
        assert_eq!(fids, vec![Some(0), Some(1), Some(2)]);
    });
}

#[test]
fn test_feature_fields() {
    with_feature("roads.geojson", 0, |feature| {
        let value = feature.field(0).unwrap().value().cloned();
        assert_eq!(value, Some(FieldValue::StringValue("primary".to_string())));
        assert_eq!(
            feature.field(1).unwrap().value().cloned().unwrap().into_int(),
            Some(2)
        );
    });
    with_feature("roads.geojson", 2, |feature| {
        assert!(feature.field(2).unwrap().is_null());
    });
}

#[test]
fn test_missing_feature() {
    with_layer("parcels.geojson", |layer| {
        assert!(layer.feature(42).is_none());
    });
}

#[test]
fn test_feature_geometry() {
    with_feature("roads.geojson", 1, |feature| {
        assert_eq!(
            feature.geometry(0).unwrap().wkt(),
            "LINESTRING (2 1,2 8)"
        );
    });
}

#[test]
fn test_attribute_filter() {
    with_layer("parcels.geojson", |layer| {
        layer.set_attribute_filter("owner = 'Smith'").unwrap();
        assert_eq!(layer.feature_count(), Some(2));
        let owners: Vec<_> = layer
            .features()
            .map(|f| f.field(1).unwrap().value().cloned().unwrap())
            .collect();
        assert!(owners
            .iter()
            .all(|o| *o == FieldValue::StringValue("Smith".to_string())));

        layer.clear_attribute_filter();
        assert_eq!(layer.feature_count(), Some(3));
    });
}

#[test]
fn test_invalid_attribute_filter() {
    with_layer("parcels.geojson", |layer| {
        let err = layer.set_attribute_filter("nosuchfield = 1").unwrap_err();
        assert!(matches!(err, InfoError::Filter(_)));
        assert_eq!(layer.feature_count(), Some(3));
    });
}

#[test]
fn test_spatial_filter() {
    with_layer("parcels.geojson", |layer| {
        layer
            .set_spatial_filter(&Geometry::bbox(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        let fids: Vec<_> = layer.features().filter_map(|f| f.fid()).collect();
        assert_eq!(fids, vec![10, 11]);

        let extent = layer.get_extent().unwrap();
        assert_near!(extent.max_x, 9.0);

        layer.clear_spatial_filter();
        assert_eq!(layer.feature_count(), Some(3));
    });
}

#[test]
fn test_filters_combine() {
    with_layer("parcels.geojson", |layer| {
        layer.set_attribute_filter("owner = 'Smith'").unwrap();
        layer
            .set_spatial_filter(&Geometry::bbox(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        let fids: Vec<_> = layer.features().filter_map(|f| f.fid()).collect();
        assert_eq!(fids, vec![10]);
    });
}

#[test]
fn test_reset_reading() {
    with_layer("roads.geojson", |layer| {
        assert_eq!(layer.features().count(), 3);
        assert_eq!(layer.features().count(), 0);
        layer.reset_feature_reading();
        assert_eq!(layer.features().count(), 3);
    });
}

#[test]
fn test_geometry_less_layer_extent() {
    let mut ds = MemoryDataSource::new("scratch");
    ds.add_layer(MemoryLayer::new("empty", Default::default()));
    let layer = ds.layer(0).unwrap();
    assert_eq!(layer.geometry_type(), GeometryType::None);
    assert!(matches!(
        layer.get_extent(),
        Err(InfoError::InvalidFieldIndex { index: 0, .. })
    ));
}
