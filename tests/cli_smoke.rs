use std::process::Command;

use tempfile::tempdir;

#[derive(Debug, serde::Deserialize)]
struct Stats {
    total: usize,
    fallback_count: usize,
    adjusted_count: usize,
}

#[derive(Debug, serde::Deserialize)]
struct ResultRow {
    subject: String,
    type_code: String,
    strategy: String,
    confidence: u8,
}

#[derive(Debug, serde::Deserialize)]
struct Report {
    results: Vec<ResultRow>,
    stats: Stats,
    cancelled: bool,
}

#[test]
fn cli_classify_jsonl_without_models() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("artists.jsonl");
    let out = dir.path().join("report.json");
    std::fs::write(
        &input,
        concat!(
            r#"{"name": "Claude Monet", "movement": "Impressionism", "birthYear": 1840}"#,
            "\n\n",
            r#"{"name": "Unknown Artist"}"#,
            "\n",
            r#"{"name": "Circle of Rembrandt", "bio": "Workshop output."}"#,
            "\n",
        ),
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_archetype"))
        .env_remove("OPENROUTER_API_KEY")
        .args(["classify", "--input"])
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let report: Report = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.fallback_count, 0);
    assert_eq!(report.stats.adjusted_count, 0);
    assert_eq!(report.results[0].subject, "Claude Monet");
    assert_eq!(report.results[0].type_code, "LREF");
    assert_eq!(report.results[1].type_code, "SREC");
    assert!(report
        .results
        .iter()
        .all(|r| r.strategy == "pure_inference" && r.confidence <= 95));
}

#[test]
fn cli_inspect_reports_categories() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("artists.json");
    std::fs::write(
        &input,
        r#"[{"name": "Workshop of Rubens"}, {"name": "Piet Mondrian", "movement": "De Stijl abstract", "nationality": "Dutch"}]"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_archetype"))
        .args(["inspect", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["category"], "attribution");
    assert_eq!(rows[0]["attribution"], true);
    assert_eq!(rows[1]["category"], "abstract");
    assert_eq!(rows[1]["heuristic_type"], "LAEF");
    assert_eq!(rows[1]["richness"], 25);
    assert_eq!(rows[1]["tier"], "limited");
}

#[test]
fn cli_types_lists_sixteen() {
    let output = Command::new(env!("CARGO_BIN_EXE_archetype"))
        .arg("types")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 16);
    assert!(stdout.lines().next().unwrap().starts_with("LAEF"));
    assert!(stdout.contains("SRMC"));
}

#[test]
fn cli_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("artists.json");
    let config = dir.path().join("config.json");
    std::fs::write(&input, "[]").unwrap();
    std::fs::write(&config, r#"{"diversity": {"ceiling": 0}}"#).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_archetype"))
        .args(["classify", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();
    assert!(!status.success());
}
