use super::*;

use shotdl_core::DiscoveryDiagnostics;
use shotdl_scraper::PipelineError;

use crate::output::FailureEnvelope;

#[test]
fn defaults_match_documented_values() {
    let cli = Cli::try_parse_from(["shotdl", "-q", "minimal logo"]).expect("expected valid cli args");
    let options = cli.run_options();

    assert_eq!(options.query, "minimal logo");
    assert_eq!(options.output_dir, PathBuf::from("./dribbble-downloads"));
    assert_eq!(options.count, 12);
    assert_eq!(options.quality, Quality::Hd);
    assert_eq!(options.delay_ms, 1000);
    assert!((options.max_size_mb - 10.0).abs() < f64::EPSILON);
    assert!(options.compress);
    assert!(!cli.headed);
    assert_eq!(cli.engine, EngineArg::Cdp);
}

#[test]
fn parses_every_flag() {
    let cli = Cli::try_parse_from([
        "shotdl",
        "--query",
        "dashboard",
        "--output",
        "/tmp/shots",
        "--count",
        "3",
        "--quality",
        "regular",
        "--delay",
        "0",
        "--max-size",
        "2.5",
        "--no-compress",
        "--headed",
        "--engine",
        "http",
    ])
    .expect("expected valid cli args");
    let options = cli.run_options();

    assert_eq!(options.query, "dashboard");
    assert_eq!(options.output_dir, PathBuf::from("/tmp/shots"));
    assert_eq!(options.count, 3);
    assert_eq!(options.quality, Quality::Regular);
    assert_eq!(options.delay_ms, 0);
    assert!((options.max_size_mb - 2.5).abs() < f64::EPSILON);
    assert!(!options.compress);
    assert!(cli.headed);
    assert_eq!(Engine::from(cli.engine), Engine::Http);
}

#[test]
fn short_flags_are_accepted() {
    let cli = Cli::try_parse_from(["shotdl", "-q", "icons", "-o", "out", "-c", "5"])
        .expect("expected valid cli args");
    assert_eq!(cli.query.as_deref(), Some("icons"));
    assert_eq!(cli.output, PathBuf::from("out"));
    assert_eq!(cli.count, 5);
}

#[test]
fn missing_query_parses_to_empty_for_pipeline_validation() {
    let cli = Cli::try_parse_from(["shotdl"]).expect("expected valid cli args");
    assert!(cli.query.is_none());
    assert_eq!(cli.run_options().query, "");
}

#[test]
fn zero_count_is_rejected() {
    assert!(Cli::try_parse_from(["shotdl", "-q", "x", "-c", "0"]).is_err());
}

#[test]
fn unknown_quality_is_rejected() {
    assert!(Cli::try_parse_from(["shotdl", "-q", "x", "--quality", "4k"]).is_err());
}

#[test]
fn no_results_envelope_carries_diagnostics() {
    let err = anyhow::Error::from(PipelineError::NoResults {
        query: "zzz".to_string(),
        diagnostics: DiscoveryDiagnostics {
            total_links: 40,
            total_images: 12,
            shot_links: 0,
        },
    });
    let json = serde_json::to_value(FailureEnvelope::from_error(&err)).unwrap();

    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "no shots found for \"zzz\"");
    assert_eq!(json["diagnostics"]["totalLinks"], 40);
    assert_eq!(json["diagnostics"]["totalImages"], 12);
    assert_eq!(json["diagnostics"]["shotLinks"], 0);
}

#[test]
fn other_failures_omit_diagnostics() {
    let err = anyhow::Error::from(PipelineError::MissingQuery);
    let json = serde_json::to_value(FailureEnvelope::from_error(&err)).unwrap();

    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "search query is required");
    assert!(json.get("diagnostics").is_none());
}

#[tokio::test]
async fn blank_query_fails_before_browser_launch() {
    let config = shotdl_core::AppConfig {
        chrome_path: Some(PathBuf::from("/nonexistent/bin/chrome")),
        cdp_endpoint: None,
        ..shotdl_core::AppConfig::default()
    };
    let dir = std::env::temp_dir().join("shotdl-blank-query-never-created");
    let options = RunOptions {
        query: "   ".to_string(),
        output_dir: dir.clone(),
        ..RunOptions::default()
    };

    let err = crate::run::run_download(&config, &options, Engine::Cdp, true)
        .await
        .expect_err("blank query must fail");

    assert!(
        matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::MissingQuery)),
        "expected MissingQuery, got: {err:#}"
    );
    assert_eq!(err.to_string(), "search query is required");
    assert!(!dir.exists(), "no output directory should be created");
}
