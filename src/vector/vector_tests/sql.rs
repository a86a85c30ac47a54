use std::collections::HashSet;

use super::open;
use crate::errors::InfoError;
use crate::vector::{sql, DataSource, FieldValue, Geometry, LayerAccess};

#[test]
fn test_sql() {
    let mut ds = open("roads.geojson");
    let query = "SELECT name, highway FROM roads WHERE highway = 'primary'";
    let mut result_set = ds
        .execute_sql(query, None, sql::Dialect::DEFAULT)
        .unwrap()
        .unwrap();

    let field_names: HashSet<_> = result_set
        .defn()
        .fields()
        .map(|field| field.name().to_string())
        .collect();

    let mut correct_field_names = HashSet::new();
    correct_field_names.insert("name".to_string());
    correct_field_names.insert("highway".to_string());

    assert_eq!(correct_field_names, field_names);
    assert_eq!(Some(2), result_set.feature_count());

    for feature in result_set.features() {
        let highway = feature
            .field(1)
            .unwrap()
            .value()
            .cloned()
            .unwrap()
            .into_string()
            .unwrap();

        assert_eq!("primary", highway);
    }
}

#[test]
fn test_sql_with_spatial_filter() {
    let query = "SELECT * FROM roads WHERE highway = 'primary'";
    let mut ds = open("roads.geojson");
    let bbox = Geometry::bbox(9.0, 1.0, 11.0, 6.0);
    let mut result_set = ds
        .execute_sql(query, Some(&bbox), sql::Dialect::DEFAULT)
        .unwrap()
        .unwrap();

    assert_eq!(Some(1), result_set.feature_count());
    let fids: Vec<_> = result_set.features().filter_map(|f| f.fid()).collect();
    assert_eq!(fids, vec![2]);
}

#[test]
fn test_sql_order_by() {
    let mut ds = open("parcels.geojson");
    let query = "SELECT owner, value FROM parcels ORDER BY value DESC";
    let mut result_set = ds
        .execute_sql(query, None, sql::Dialect::OGR)
        .unwrap()
        .unwrap();

    let values: Vec<_> = result_set
        .features()
        .map(|f| f.field(1).unwrap().value().cloned())
        .collect();
    assert_eq!(
        values,
        vec![
            Some(FieldValue::RealValue(125000.5)),
            Some(FieldValue::RealValue(98000.25)),
            None,
        ]
    );
}

#[test]
fn test_sql_keeps_fids() {
    let mut ds = open("parcels.geojson");
    let mut result_set = ds
        .execute_sql("SELECT * FROM parcels WHERE owner = 'Smith'", None, sql::Dialect::DEFAULT)
        .unwrap()
        .unwrap();
    assert!(result_set.feature(12).is_some());
    assert!(result_set.feature(11).is_none());
}

#[test]
fn test_sql_where_on_result_set() {
    let mut ds = open("parcels.geojson");
    let mut result_set = ds
        .execute_sql("SELECT * FROM parcels", None, sql::Dialect::DEFAULT)
        .unwrap()
        .unwrap();
    result_set.set_attribute_filter("value IS NULL").unwrap();
    assert_eq!(result_set.feature_count(), Some(1));
}

#[test]
fn test_sql_no_such_table() {
    let mut ds = open("roads.geojson");
    let err = ds
        .execute_sql("SELECT * FROM rivers", None, sql::Dialect::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, InfoError::InvalidSql { .. }));
}

#[test]
fn test_sql_unknown_column() {
    let mut ds = open("roads.geojson");
    let err = ds
        .execute_sql("SELECT colour FROM roads", None, sql::Dialect::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, InfoError::InvalidSql { .. }));
}

#[test]
fn test_sqlite_dialect_unsupported() {
    let mut ds = open("roads.geojson");
    let err = ds
        .execute_sql("SELECT * FROM roads", None, sql::Dialect::SQLITE)
        .unwrap_err();
    assert!(matches!(err, InfoError::UnsupportedDialect { .. }));
}
