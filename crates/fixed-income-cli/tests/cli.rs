use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const REFERENCE_BOND: &str = r#"{
    "bond": {
        "type": "FixedRate",
        "face_value": "1000",
        "coupon_rate": "5",
        "maturity_date": "2030-01-15",
        "frequency": 2,
        "day_count": "Thirty360"
    },
    "ytm": "4.5",
    "settlement_date": "2025-01-15"
}"#;

fn fia() -> Command {
    Command::cargo_bin("fia").unwrap()
}

fn input_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_version() {
    fia()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("fia "));
}

#[test]
fn test_price_bond_from_file() {
    let file = input_file(".json", REFERENCE_BOND);
    fia()
        .args(["price-bond", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"clean_price\""))
        .stdout(predicate::str::contains("rust_decimal_128bit"));
}

#[test]
fn test_price_bond_from_stdin_minimal() {
    fia()
        .args(["price-bond", "--output", "minimal"])
        .write_stdin(REFERENCE_BOND)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1022.1655"));
}

#[test]
fn test_cds_from_yaml() {
    let file = input_file(
        ".yaml",
        r#"
reference_entity: Acme Corp
notional: "10000000"
spread_bps: "100"
recovery_rate: "0.4"
risk_free_rate: "4"
maturity_years: 5
payment_frequency: 4
market_spread_bps: "150"
"#,
    );
    fia()
        .args(["cds", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("mark_to_market"))
        .stdout(predicate::str::contains("Acme Corp"));
}

#[test]
fn test_year_fraction_thirty_360() {
    fia()
        .args([
            "year-fraction",
            "--start",
            "2025-01-15",
            "--end",
            "2025-07-15",
            "--convention",
            "30/360",
            "--output",
            "minimal",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0.5"));
}

#[test]
fn test_interpolate_csv() {
    let curve = r#"{
        "curve": {
            "points": [
                { "maturity": "1", "rate": "3.0" },
                { "maturity": "5", "rate": "4.0" }
            ],
            "method": "Linear"
        },
        "maturities": ["0.5", "3", "10"]
    }"#;
    fia()
        .args(["interpolate", "--output", "csv"])
        .write_stdin(curve)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("maturity,rate,discount_factor"))
        .stdout(predicate::str::contains("3,3.5"));
}

#[test]
fn test_migration_table() {
    let matrix = r#"{
        "transition_matrix": {
            "ratings": ["IG", "HY", "D"],
            "probabilities": [
                ["0.95", "0.04", "0.01"],
                ["0.10", "0.85", "0.05"],
                ["0", "0", "1"]
            ]
        },
        "time_horizon_years": 2
    }"#;
    fia()
        .args(["migration", "--output", "table"])
        .write_stdin(matrix)
        .assert()
        .success()
        .stdout(predicate::str::contains("Field"))
        .stdout(predicate::str::contains("results"));
}

#[test]
fn test_invalid_input_fails_with_error() {
    let bad = REFERENCE_BOND.replace("\"4.5\"", "\"-250\"");
    fia()
        .arg("price-bond")
        .write_stdin(bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_input_file() {
    fia()
        .args(["duration", "--input", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_cva_rejects_out_of_range_default_curve() {
    let request = r#"{
        "trade_description": "swap",
        "expected_exposure_profile": [{ "time_years": "2", "expected_exposure": "100" }],
        "counterparty": {
            "default_model": {
                "type": "Curve",
                "curve": { "tenors": ["2", "1"], "cumulative": ["1.5", "0.2"] }
            },
            "recovery_rate": "0"
        },
        "risk_free_rate": "0"
    }"#;
    fia()
        .arg("cva")
        .write_stdin(request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tenors must be strictly increasing"));
}

#[test]
fn test_migration_horizon_beyond_cap_fails() {
    let request = r#"{
        "transition_matrix": {
            "ratings": ["IG", "D"],
            "probabilities": [["1.0009", "0"], ["0", "1"]]
        },
        "time_horizon_years": 100000
    }"#;
    fia()
        .arg("migration")
        .write_stdin(request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("time_horizon_years"));
}
