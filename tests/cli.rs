use std::path::PathBuf;

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;

fn ogrinfo() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("ogrinfo"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn test_summary_of_all_layers() {
    ogrinfo()
        .args(["-ro", "-al", "-so"])
        .arg(fixture("parcels.geojson"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer name: parcels\nGeometry: Polygon\nFeature Count: 3\n"))
        .stdout(predicate::str::contains("OGRFeature").not())
        .stderr(predicate::str::contains("INFO: Open of `"))
        .stderr(predicate::str::contains("using driver `GeoJSON' successful."));
}

#[test]
fn test_attribute_filter() {
    ogrinfo()
        .args(["-q", "-where", "owner = 'Smith'"])
        .arg(fixture("parcels.geojson"))
        .arg("parcels")
        .assert()
        .success()
        .stdout(predicate::str::contains("OGRFeature(parcels):10\n"))
        .stdout(predicate::str::contains("OGRFeature(parcels):12\n"))
        .stdout(predicate::str::contains("Jones").not())
        .stderr("");
}

#[test]
fn test_fetch_by_feature_id() {
    ogrinfo()
        .args(["-q", "-fid", "11"])
        .arg(fixture("parcels.geojson"))
        .arg("parcels")
        .assert()
        .success()
        .stdout(predicate::str::contains("OGRFeature(parcels):11\n"))
        .stdout(predicate::str::contains("owner (String) = Jones"))
        .stdout(predicate::str::contains("Smith").not());
}

#[test]
fn test_missing_feature_id() {
    ogrinfo()
        .args(["-q", "-fid", "99"])
        .arg(fixture("parcels.geojson"))
        .arg("parcels")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Unable to locate feature id 99 on this layer.",
        ));
}

#[test]
fn test_spatial_filter_and_geometry_summary() {
    ogrinfo()
        .args(["-q", "-al", "-spat", "19", "19", "25", "25", "-geom=SUMMARY"])
        .arg(fixture("parcels.geojson"))
        .assert()
        .success()
        .stdout(predicate::str::contains("OGRFeature(parcels):12\n"))
        .stdout(predicate::str::contains("OGRFeature(parcels):10\n").not())
        .stdout(predicate::str::contains("POLYGON ((").not());
}

#[test]
fn test_xml_report() {
    ogrinfo()
        .args(["-q", "-al", "-xml"])
        .arg(fixture("roads.geojson"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<Layer>"))
        .stdout(predicate::str::contains("<Features>"))
        .stdout(predicate::str::contains("Layer name:").not());
}

#[test]
fn test_sql() {
    ogrinfo()
        .args(["-q", "-sql", "SELECT owner FROM parcels WHERE id > 1"])
        .arg(fixture("parcels.geojson"))
        .assert()
        .success()
        .stdout(predicate::str::contains("owner (String) = Jones"))
        .stdout(predicate::str::contains("value (Real)").not());
}

#[test]
fn test_list_layers() {
    ogrinfo()
        .arg("-ro")
        .arg(fixture("city"))
        .assert()
        .success()
        .stdout("1: parks (Point)\n2: rivers (Line String)\n");
}

#[test]
fn test_formats() {
    ogrinfo()
        .arg("--formats")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Supported Formats:\n"))
        .stdout(predicate::str::contains("  -> \"GeoJSON\"\n"));
}

#[test]
fn test_no_datasource() {
    ogrinfo()
        .arg("-al")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::starts_with("Usage: ogrinfo"))
        .stderr(predicate::str::contains("FAILURE: No datasource specified."));
}

#[test]
fn test_unknown_option() {
    ogrinfo()
        .args(["-bogus", "a.geojson"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAILURE: Unknown option name '-bogus'"));
}

#[test]
fn test_unopenable_datasource() {
    ogrinfo()
        .arg(fixture("missing.geojson"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "FAILURE:\nUnable to open datasource `",
        ))
        .stdout(predicate::str::contains("  -> GeoJSON\n"));
}

#[test]
fn test_malformed_geojson_lists_drivers() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.geojson");
    std::fs::write(&broken, "{bad").unwrap();
    ogrinfo()
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "FAILURE:\nUnable to open datasource `",
        ))
        .stderr(predicate::str::contains("Unable to parse").not())
        .stdout(predicate::str::contains("  -> GeoJSON\n"));
}

#[test]
fn test_input_format_restricts_drivers() {
    ogrinfo()
        .args(["-if", "ESRI Shapefile"])
        .arg(fixture("roads.geojson"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to open datasource `"));

    ogrinfo()
        .args(["-if", "GeoJSON", "-q"])
        .arg(fixture("roads.geojson"))
        .assert()
        .success()
        .stdout("1: roads (Line String)\n");
}

#[test]
fn test_json_format_rejected() {
    ogrinfo()
        .args(["-format", "json", "-al"])
        .arg(fixture("roads.geojson"))
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("is not supported"));
}

#[test]
fn test_invalid_attribute_filter() {
    ogrinfo()
        .args(["-q", "-where", "owner = "])
        .arg(fixture("parcels.geojson"))
        .arg("parcels")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SetAttributeFilter(owner = ) failed"));
}

#[test]
fn test_requested_layer_missing() {
    ogrinfo()
        .arg("-q")
        .arg(fixture("parcels.geojson"))
        .arg("lakes")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "FAILURE: Couldn't fetch requested layer lakes!",
        ));
}
