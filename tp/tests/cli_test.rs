//! Command-line behavior of the `tp` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `tp` isolated from the user's config and log directories
fn tp(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tp").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn day(n: u32, city: &str, lat: f64, lng: f64) -> String {
    format!(
        r#"{{"dayNumber": {n}, "title": "Day {n}", "city": "{city}", "country": "USA",
            "anchorLocation": {{"id": "a{n}", "name": "{city}", "location": {{"lat": {lat}, "lng": {lng}}}, "category": "city"}},
            "activities": [
              {{"id": "d{n}-1", "name": "Stop one", "timeSlot": "morning", "source": "resolved",
                "place": {{"id": "p{n}-1", "name": "Stop one", "location": {{"lat": {lat}, "lng": {lng}}}, "category": "place"}}}},
              {{"id": "d{n}-2", "name": "Stop two", "timeSlot": "afternoon", "source": "resolved",
                "place": {{"id": "p{n}-2", "name": "Stop two", "location": {{"lat": {lat2}, "lng": {lng}}}, "category": "place"}}}}
            ]}}"#,
        lat2 = lat + 0.01
    )
}

fn plan_json(days: &[String]) -> String {
    format!(
        r#"{{"id": "plan-1", "request": "road trip", "title": "Trip", "summary": "", "days": [{}]}}"#,
        days.join(",")
    )
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    tp(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("itineraries"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("coord"));
}

#[test]
fn test_coord_null_island() {
    let home = TempDir::new().unwrap();
    tp(&home)
        .args(["coord", "0", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("INV-GEO-01"));
}

#[test]
fn test_coord_region_mismatch() {
    let home = TempDir::new().unwrap();
    tp(&home)
        .args(["coord", "48.8566", "2.3522", "--region", "us"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INV-GEO-03"));
}

#[test]
fn test_coord_json() {
    let home = TempDir::new().unwrap();
    tp(&home)
        .args(["coord", "41.8781", "-87.6298", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"confidence\": \"HIGH\""))
        .stdout(predicate::str::contains("US_CONTINENTAL"));
}

#[test]
fn test_validate_flags_return_to_origin() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("plan.json");
    let json = plan_json(&[
        day(1, "Los Angeles", 34.0522, -118.2437),
        day(2, "Flagstaff", 35.1983, -111.6513),
        day(3, "Los Angeles", 34.0522, -118.2437),
        day(4, "Chicago", 41.8781, -87.6298),
    ]);
    std::fs::write(&path, json).unwrap();

    tp(&home)
        .args(["validate", path.to_str().unwrap(), "--trip-type", "one-way"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INV-DIR-03"))
        .stdout(predicate::str::contains("invalid"));
}

#[test]
fn test_validate_clean_direction() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("plan.json");
    let json = plan_json(&[
        day(1, "Los Angeles", 34.0522, -118.2437),
        day(2, "Flagstaff", 35.1983, -111.6513),
        day(3, "Albuquerque", 35.0844, -106.6504),
    ]);
    std::fs::write(&path, json).unwrap();

    tp(&home)
        .args(["validate", path.to_str().unwrap(), "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INV-DIR").not());
}

#[test]
fn test_validate_missing_file() {
    let home = TempDir::new().unwrap();
    tp(&home)
        .args(["validate", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_plan_without_api_key_fails() {
    let home = TempDir::new().unwrap();
    tp(&home)
        .env_remove("ANTHROPIC_API_KEY")
        .args(["plan", "weekend in Chicago"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}
