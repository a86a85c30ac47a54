use geo_types::point;

use super::*;
use crate::test_utils::{fixture, TempFixture};
use crate::vector::memory::{MemoryDataSource, MemoryLayer};
use crate::vector::{Defn, FieldDefn, FieldType, FieldValue, GeomFieldDefn};

fn parcels() -> MemoryDataSource {
    let defn = Defn::new(
        vec![FieldDefn::new("owner", FieldType::String)],
        vec![GeomFieldDefn::new("geom", GeometryType::Polygon)],
    );
    let mut layer = MemoryLayer::new("parcels", defn);
    for (owner, x) in [("Smith", 0.0), ("Jones", 5.0), ("Smith", 20.0)] {
        let mut feature = layer.new_feature();
        feature
            .set_field(0, FieldValue::StringValue(owner.to_string()))
            .unwrap();
        feature
            .set_geometry(0, Geometry::bbox(x, x, x + 4.0, x + 4.0))
            .unwrap();
        layer.add_feature(feature).unwrap();
    }
    let mut source = MemoryDataSource::new("memory");
    source.add_layer(layer);
    source
}

fn sites() -> MemoryDataSource {
    let defn = Defn::new(
        vec![FieldDefn::new("name", FieldType::String)],
        vec![
            GeomFieldDefn::new("geom", GeometryType::Point),
            GeomFieldDefn::new("label", GeometryType::Point),
        ],
    );
    let mut layer = MemoryLayer::new("sites", defn);
    let rows = [
        ("depot", (1.0, 1.0), (100.0, 100.0)),
        ("yard", (50.0, 50.0), (2.0, 2.0)),
    ];
    for (name, geom, label) in rows {
        let mut feature = layer.new_feature();
        feature
            .set_field(0, FieldValue::StringValue(name.to_string()))
            .unwrap();
        feature
            .set_geometry(0, point!(x: geom.0, y: geom.1).into())
            .unwrap();
        feature
            .set_geometry(1, point!(x: label.0, y: label.1).into())
            .unwrap();
        layer.add_feature(feature).unwrap();
    }
    let mut source = MemoryDataSource::new("memory");
    source.add_layer(layer);
    source
}

fn report_on<D: DataSource>(config: &RunConfiguration, source: &mut D) -> (String, String) {
    let mut report = Vec::new();
    let mut diagnostics = Vec::new();
    Reporter::new(config, &mut report, &mut diagnostics)
        .unwrap()
        .run(source)
        .unwrap();
    (
        String::from_utf8(report).unwrap(),
        String::from_utf8(diagnostics).unwrap(),
    )
}

fn run_on_path(config: &RunConfiguration) -> (Result<()>, String, String) {
    let mut report = Vec::new();
    let mut diagnostics = Vec::new();
    let result = run(config, &mut report, &mut diagnostics);
    (
        result,
        String::from_utf8(report).unwrap(),
        String::from_utf8(diagnostics).unwrap(),
    )
}

#[test]
fn test_attribute_filtered_layer() {
    let config = RunConfiguration {
        layers: vec!["parcels".to_string()],
        attribute_filter: Some("owner = 'Smith'".to_string()),
        ..RunConfiguration::new("memory")
    };
    let (report, diagnostics) = report_on(&config, &mut parcels());
    assert_eq!(
        report,
        "\nLayer name: parcels\n\
         Geometry: Polygon\n\
         Feature Count: 2\n\
         Extent: (0.000000, 0.000000) - (24.000000, 24.000000)\n\
         Layer SRS WKT:\n\
         (unknown)\n\
         Geometry Column = geom\n\
         owner: String (0.0)\n\
         OGRFeature(parcels):0\n  \
         owner (String) = Smith\n  \
         POLYGON ((0 0,0 4,4 4,4 0,0 0))\n\n\
         OGRFeature(parcels):2\n  \
         owner (String) = Smith\n  \
         POLYGON ((20 20,20 24,24 24,24 20,20 20))\n\n"
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_spatial_filter_on_second_geometry_field() {
    let bbox = Geometry::bbox(0.0, 0.0, 10.0, 10.0);
    let config = RunConfiguration {
        list_all: true,
        verbose: false,
        spatial_filter: Some(bbox),
        ..RunConfiguration::new("memory")
    };
    let (report, _) = report_on(&config, &mut sites());
    assert!(report.contains("OGRFeature(sites):0\n"));
    assert!(!report.contains("OGRFeature(sites):1\n"));

    let config = RunConfiguration {
        geometry_field: Some("label".to_string()),
        ..config
    };
    let (report, _) = report_on(&config, &mut sites());
    assert!(!report.contains("OGRFeature(sites):0\n"));
    assert!(report.contains("OGRFeature(sites):1\n  name (String) = yard\n"));
}

#[test]
fn test_unknown_geometry_field_warns() {
    let config = RunConfiguration {
        list_all: true,
        verbose: false,
        spatial_filter: Some(Geometry::bbox(0.0, 0.0, 10.0, 10.0)),
        geometry_field: Some("centroid".to_string()),
        ..RunConfiguration::new("memory")
    };
    let (report, diagnostics) = report_on(&config, &mut sites());
    assert_eq!(diagnostics, "WARNING: Cannot find geometry field centroid.\n");
    assert!(report.contains("OGRFeature(sites):0\n"));
    assert!(report.contains("OGRFeature(sites):1\n"));
}

#[test]
fn test_missing_feature_id() {
    let config = RunConfiguration {
        list_all: true,
        verbose: false,
        fetch_fid: Some(42),
        ..RunConfiguration::new("memory")
    };
    let (report, diagnostics) = report_on(&config, &mut parcels());
    assert_eq!(
        report,
        "\nLayer name: parcels\nUnable to locate feature id 42 on this layer.\n"
    );
    assert!(diagnostics.is_empty());

    let config = RunConfiguration {
        format: ReportFormat::XmlTree,
        ..config
    };
    let (report, diagnostics) = report_on(&config, &mut parcels());
    assert_eq!(
        diagnostics,
        "Unable to locate feature id 42 on this layer.\n"
    );
    assert!(report.contains("<Features />"));
}

#[test]
fn test_feature_id_wins_over_summary() {
    let config = RunConfiguration {
        list_all: true,
        verbose: false,
        summary_only: true,
        fetch_fid: Some(1),
        ..RunConfiguration::new("memory")
    };
    let (report, _) = report_on(&config, &mut parcels());
    assert!(report.contains("OGRFeature(parcels):1\n  owner (String) = Jones\n"));
    assert!(!report.contains("OGRFeature(parcels):0\n"));
}

#[test]
fn test_xml_summary_from_file() {
    let config = RunConfiguration {
        layers: vec!["parcels".to_string()],
        summary_only: true,
        format: ReportFormat::XmlTree,
        ..RunConfiguration::new(fixture("parcels.geojson"))
    };
    let (result, report, diagnostics) = run_on_path(&config);
    result.unwrap();
    assert!(report.starts_with(
        "<Layer>\n  \
         <Meta>\n    \
         <Name>parcels</Name>\n    \
         <FeatureCount>3</FeatureCount>\n    \
         <GeometryField name=\"\" type=\"Polygon\">\n      \
         <Extent minx=\"0.000000\" miny=\"0.000000\" maxx=\"24.000000\" maxy=\"24.000000\" />\n"
    ));
    assert!(report.contains("    <Field name=\"owner\" type=\"String\" width=\"0\" precision=\"0\" />\n"));
    assert!(report.ends_with("  </Meta>\n  <Features />\n</Layer>\n\n"));
    assert!(diagnostics.starts_with("Had to open data source read-only.\nINFO: Open of `"));
    assert!(diagnostics.contains("using driver `GeoJSON' successful."));
}

#[test]
fn test_read_only_open_is_silent_about_retry() {
    let config = RunConfiguration {
        read_only: true,
        ..RunConfiguration::new(fixture("roads.geojson"))
    };
    let (result, report, diagnostics) = run_on_path(&config);
    result.unwrap();
    assert_eq!(report, "1: roads (Line String)\n");
    assert!(!diagnostics.contains("read-only"));
    assert!(diagnostics.starts_with("INFO: Open of `"));
}

#[test]
fn test_json_fails_before_output() {
    let config = RunConfiguration {
        list_all: true,
        format: ReportFormat::Json,
        ..RunConfiguration::new(fixture("roads.geojson"))
    };
    let (result, report, diagnostics) = run_on_path(&config);
    assert!(matches!(
        result,
        Err(InfoError::UnsupportedFormat { format }) if format == "Json"
    ));
    assert!(report.is_empty());
    assert!(diagnostics.is_empty());
}

#[test]
fn test_open_failure() {
    let config = RunConfiguration::new(fixture("missing.geojson"));
    let (result, report, _) = run_on_path(&config);
    assert!(matches!(result, Err(InfoError::OpenFailure { .. })));
    assert!(report.is_empty());
}

#[test]
fn test_text_and_xml_dump_the_same_features() {
    let text_config = RunConfiguration {
        list_all: true,
        verbose: false,
        ..RunConfiguration::new(fixture("parcels.geojson"))
    };
    let xml_config = RunConfiguration {
        format: ReportFormat::XmlTree,
        ..text_config.clone()
    };
    let (_, text, _) = run_on_path(&text_config);
    let (_, xml, _) = run_on_path(&xml_config);

    for fid in [10, 11, 12] {
        assert!(text.contains(&format!("OGRFeature(parcels):{fid}\n")));
        assert!(xml.contains(&format!("<Feature id=\"{fid}\">")));
    }
    for owner in ["Smith", "Jones"] {
        assert!(text.contains(&format!("  owner (String) = {owner}\n")));
        assert!(xml.contains(&format!("<Attr name=\"owner\">{owner}</Attr>")));
    }
    assert!(text.contains("  value (Real) = (null)\n"));
    assert!(xml.contains("<Attr name=\"value\"></Attr>"));
    assert!(text.contains("  POLYGON ((20 20,20 24,24 24,24 20,20 20))\n"));
    assert!(xml.contains(
        "<Geometry name=\"\">POLYGON ((20 20,20 24,24 24,24 20,20 20))</Geometry>"
    ));
}

/// Fields, style and geometries of one rendered feature.
#[derive(Debug, Default, PartialEq)]
struct RenderedFeature {
    fid: String,
    attributes: Vec<(String, String)>,
    style: Option<String>,
    geometries: Vec<(String, String)>,
}

/// Reads the features back from a plain text report. `(null)` reads as an
/// empty value, as XML cannot tell the two apart.
fn text_features(text: &str) -> Vec<RenderedFeature> {
    let mut features: Vec<RenderedFeature> = Vec::new();
    for line in text.lines() {
        if let Some(header) = line.strip_prefix("OGRFeature(") {
            let (_, fid) = header.split_once("):").unwrap();
            features.push(RenderedFeature {
                fid: fid.to_string(),
                ..RenderedFeature::default()
            });
            continue;
        }
        let (Some(feature), Some(body)) = (features.last_mut(), line.strip_prefix("  ")) else {
            continue;
        };
        let (left, value) = body.split_once(" = ").unwrap();
        if let Some((name, _field_type)) = left.split_once(" (") {
            let value = if value == "(null)" { "" } else { value };
            feature.attributes.push((name.to_string(), value.to_string()));
        } else if left == "Style" {
            feature.style = Some(value.to_string());
        } else {
            feature.geometries.push((left.to_string(), value.to_string()));
        }
    }
    features
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// `name="..."` attribute and text content of a single line XML element.
fn xml_element<'a>(line: &'a str, tag: &str) -> Option<(&'a str, Option<String>)> {
    let rest = line.strip_prefix(&format!("<{tag}"))?;
    let name = rest
        .strip_prefix(" name=\"")
        .and_then(|r| r.split_once('"'))
        .map_or("", |(name, _)| name);
    if rest.ends_with(" />") {
        return Some((name, None));
    }
    let (_, content) = rest.split_once('>')?;
    let text = content.strip_suffix(&format!("</{tag}>"))?;
    Some((name, Some(unescape(text))))
}

fn xml_features(xml: &str) -> Vec<RenderedFeature> {
    let mut features: Vec<RenderedFeature> = Vec::new();
    for line in xml.lines().map(str::trim) {
        if let Some(id) = line.strip_prefix("<Feature id=\"") {
            features.push(RenderedFeature {
                fid: id.trim_end_matches("\">").to_string(),
                ..RenderedFeature::default()
            });
            continue;
        }
        let Some(feature) = features.last_mut() else {
            continue;
        };
        if let Some((name, text)) = xml_element(line, "Attr") {
            feature
                .attributes
                .push((name.to_string(), text.unwrap_or_default()));
        } else if let Some((_, text)) = xml_element(line, "Style") {
            feature.style = text;
        } else if let Some((name, Some(wkt))) = xml_element(line, "Geometry") {
            feature.geometries.push((name.to_string(), wkt));
        }
    }
    features
}

fn depots() -> MemoryDataSource {
    let defn = Defn::new(
        vec![
            FieldDefn::new("name", FieldType::String),
            FieldDefn::new("note", FieldType::String),
            FieldDefn::new("bays", FieldType::Integer),
            FieldDefn::new("memo", FieldType::String),
        ],
        vec![
            GeomFieldDefn::new("geom", GeometryType::Point),
            GeomFieldDefn::new("label", GeometryType::Point),
        ],
    );
    let mut layer = MemoryLayer::new("depots", defn);

    let mut feature = layer.new_feature();
    feature
        .set_field(0, FieldValue::StringValue("north".to_string()))
        .unwrap();
    feature
        .set_field(1, FieldValue::StringValue(String::new()))
        .unwrap();
    feature.set_field(2, FieldValue::IntegerValue(12)).unwrap();
    feature.set_style_string("SYMBOL(id:\"ogr-sym-3\",c:#FF0000)");
    feature
        .set_geometry(0, point!(x: 1.0, y: 2.0).into())
        .unwrap();
    feature
        .set_geometry(1, point!(x: 1.5, y: 2.5).into())
        .unwrap();
    layer.add_feature(feature).unwrap();

    let mut feature = layer.new_feature();
    feature
        .set_field(0, FieldValue::StringValue("south".to_string()))
        .unwrap();
    feature.set_field_null(1).unwrap();
    feature
        .set_field(3, FieldValue::StringValue("bays < 3 & \"closed\"".to_string()))
        .unwrap();
    feature
        .set_geometry(0, point!(x: -4.0, y: 0.25).into())
        .unwrap();
    layer.add_feature(feature).unwrap();

    let mut source = MemoryDataSource::new("memory");
    source.add_layer(layer);
    source
}

#[test]
fn test_text_and_xml_render_equivalent_records() {
    let text_config = RunConfiguration {
        list_all: true,
        verbose: false,
        ..RunConfiguration::new("memory")
    };
    let xml_config = RunConfiguration {
        format: ReportFormat::XmlTree,
        ..text_config.clone()
    };
    let (text, _) = report_on(&text_config, &mut depots());
    let (xml, _) = report_on(&xml_config, &mut depots());

    let from_text = text_features(&text);
    assert_eq!(from_text, xml_features(&xml));

    let pairs = |values: &[(&str, &str)]| -> Vec<(String, String)> {
        values
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    };
    assert_eq!(
        from_text,
        vec![
            RenderedFeature {
                fid: "0".to_string(),
                attributes: pairs(&[("name", "north"), ("note", ""), ("bays", "12"), ("memo", "")]),
                style: Some("SYMBOL(id:\"ogr-sym-3\",c:#FF0000)".to_string()),
                geometries: pairs(&[("geom", "POINT (1 2)"), ("label", "POINT (1.5 2.5)")]),
            },
            RenderedFeature {
                fid: "1".to_string(),
                attributes: pairs(&[
                    ("name", "south"),
                    ("note", ""),
                    ("bays", ""),
                    ("memo", "bays < 3 & \"closed\""),
                ]),
                style: None,
                geometries: pairs(&[("geom", "POINT (-4 0.25)")]),
            },
        ]
    );

    assert!(text.contains("  note (String) = \n"));
    assert!(text.contains("  memo (String) = (null)\n"));
    assert!(xml.contains("<Attr name=\"memo\" />"));
    assert!(xml.contains("<Geometry name=\"label\" />"));
}

#[test]
fn test_malformed_geojson_reports_open_failure() {
    let broken = TempFixture::empty("broken.geojson");
    std::fs::write(broken.path(), "{\"type\": \"FeatureCollection\", \"features\": [").unwrap();
    let (result, report, diagnostics) = run_on_path(&RunConfiguration::new(broken.path()));
    match result {
        Err(InfoError::OpenFailure { path, drivers }) => {
            assert_eq!(path, broken.path());
            assert!(drivers.contains(&"GeoJSON".to_string()));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(report.is_empty());
    assert!(diagnostics.is_empty());
}

#[cfg(not(feature = "gdal"))]
#[test]
fn test_directory_without_geojson_reports_open_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("readme.txt"), "no layers here").unwrap();
    let (result, report, diagnostics) = run_on_path(&RunConfiguration {
        list_all: true,
        ..RunConfiguration::new(dir.path())
    });
    assert!(matches!(result, Err(InfoError::OpenFailure { .. })));
    assert!(report.is_empty());
    assert!(!diagnostics.contains("successful"));
}

#[test]
fn test_allowed_drivers_restrict_open() {
    let config = RunConfiguration {
        allowed_drivers: vec!["ESRI Shapefile".to_string()],
        ..RunConfiguration::new(fixture("roads.geojson"))
    };
    let (result, report, _) = run_on_path(&config);
    assert!(matches!(result, Err(InfoError::OpenFailure { .. })));
    assert!(report.is_empty());

    let config = RunConfiguration {
        allowed_drivers: vec!["GeoJSON".to_string()],
        ..config
    };
    let (result, report, diagnostics) = run_on_path(&config);
    result.unwrap();
    assert_eq!(report, "1: roads (Line String)\n");
    assert!(diagnostics.contains("using driver `GeoJSON' successful."));
}

#[test]
fn test_repeat_count() {
    let config = RunConfiguration {
        list_all: true,
        verbose: false,
        repeat_count: 2,
        ..RunConfiguration::new("memory")
    };
    let (report, _) = report_on(&config, &mut parcels());
    assert_eq!(report.matches("Layer name: parcels\n").count(), 2);
    assert_eq!(report.matches("OGRFeature(parcels):0\n").count(), 2);

    let config = RunConfiguration {
        repeat_count: 0,
        ..config
    };
    let (report, _) = report_on(&config, &mut parcels());
    assert!(report.is_empty());
}

#[test]
fn test_listing() {
    let config = RunConfiguration::new(fixture("city"));
    let (result, report, _) = run_on_path(&config);
    result.unwrap();
    assert_eq!(report, "1: parks (Point)\n2: rivers (Line String)\n");

    let (report, _) = report_on(&config, &mut sites());
    assert_eq!(report, "1: sites (Point, Point)\n");

    let mut source = MemoryDataSource::new("memory");
    source.add_layer(MemoryLayer::new(
        "plain",
        Defn::new(vec![FieldDefn::new("a", FieldType::String)], vec![]),
    ));
    let (report, _) = report_on(&config, &mut source);
    assert_eq!(report, "1: plain (None)\n");
}

#[test]
fn test_requested_layer_not_found() {
    let config = RunConfiguration {
        layers: vec!["roads".to_string()],
        ..RunConfiguration::new("memory")
    };
    let mut report = Vec::new();
    let err = Reporter::new(&config, &mut report, &mut std::io::sink())
        .unwrap()
        .run(&mut parcels())
        .unwrap_err();
    assert!(matches!(err, InfoError::LayerNotFound { name } if name == "roads"));
}

#[test]
fn test_invalid_attribute_filter_is_fatal() {
    let config = RunConfiguration {
        list_all: true,
        attribute_filter: Some("owner = ".to_string()),
        ..RunConfiguration::new("memory")
    };
    let mut report = Vec::new();
    let err = Reporter::new(&config, &mut report, &mut std::io::sink())
        .unwrap()
        .run(&mut parcels())
        .unwrap_err();
    assert!(matches!(err, InfoError::Filter(_)));
}

#[test]
fn test_sql_result_set() {
    let config = RunConfiguration {
        layers: vec!["ignored".to_string()],
        verbose: false,
        sql: Some("SELECT owner FROM parcels".to_string()),
        attribute_filter: Some("owner = 'Smith'".to_string()),
        ..RunConfiguration::new("memory")
    };
    let (report, diagnostics) = report_on(&config, &mut parcels());
    assert_eq!(diagnostics, "layer names ignored in combination with -sql.\n");
    assert!(report.starts_with("\nLayer name: parcels\n"));
    assert!(report.contains("OGRFeature(parcels):0\n"));
    assert!(report.contains("OGRFeature(parcels):2\n"));
    assert!(!report.contains("OGRFeature(parcels):1\n"));
}

#[test]
fn test_sql_spatial_filter() {
    let bbox = Geometry::bbox(0.0, 0.0, 10.0, 10.0);
    let config = RunConfiguration {
        verbose: false,
        sql: Some("SELECT * FROM sites".to_string()),
        spatial_filter: Some(bbox),
        ..RunConfiguration::new("memory")
    };
    let (report, _) = report_on(&config, &mut sites());
    assert!(report.contains("OGRFeature(sites):0\n"));
    assert!(!report.contains("OGRFeature(sites):1\n"));

    let config = RunConfiguration {
        geometry_field: Some("label".to_string()),
        ..config
    };
    let (report, _) = report_on(&config, &mut sites());
    assert!(!report.contains("OGRFeature(sites):0\n"));
    assert!(report.contains("OGRFeature(sites):1\n"));
}

#[test]
fn test_writer_for() {
    assert!(writer_for(ReportFormat::PlainText, DisplayOptions::default()).is_ok());
    let xml = writer_for(ReportFormat::XmlTree, DisplayOptions::default()).unwrap();
    assert!(!xml.reports_missing_features());
    assert!(matches!(
        writer_for(ReportFormat::Json, DisplayOptions::default()),
        Err(InfoError::UnsupportedFormat { .. })
    ));
}
