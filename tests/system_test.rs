mod common;

use common::*;
use inferno::application::market_data::CandleStore;
use inferno::application::ml::ModelInferenceEngine;
use inferno::application::signal_service::SignalService;
use inferno::application::strategies::DonchianStrategy;
use inferno::application::system::Application;
use inferno::config::Config;
use inferno::domain::errors::SignalError;
use inferno::domain::signal::{SignalRequest, SignalType, Suggestion};
use inferno::infrastructure::mock::MockCandleFeed;
use inferno::infrastructure::observability::Metrics;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(&|key| vars.get(key).cloned()).expect("valid config")
}

fn write_artifact(dir: &tempfile::TempDir, name: &str, intercept: f64) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let json = serde_json::to_string_pretty(&constant_artifact(intercept, 0.5)).unwrap();
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn test_mock_system_answers_both_modes() {
    // 1. Model bundle on disk, mock feed generating history on demand
    let dir = tempfile::tempdir().unwrap();
    let path = write_artifact(&dir, "combo_clf_prod.json", 2.0);
    let model = assert_ok!(ModelInferenceEngine::load(&path));

    let config = config(&[
        ("FEED_MODE", "mock"),
        ("SYMBOLS", "BTC,ETH"),
        ("MAX_CANDLES", "200"),
    ]);
    let feed = MockCandleFeed::new();
    let app = Application::from_parts(config, Arc::new(feed.clone()), model).unwrap();

    // 2. Start seeds every configured symbol
    let handle = app.start().await.unwrap();
    assert_eq!(handle.store.symbols(), vec!["BTC".to_string(), "ETH".to_string()]);
    assert_eq!(handle.store.len("BTC"), Some(200));

    // 3. Both paths answer
    let ml = handle.service.handle(&SignalRequest::new("BTC", SignalType::Ml));
    assert!(ml.success);
    assert_eq!(ml.suggestion, Suggestion::Buy);
    assert!(ml.prediction.unwrap().confidence > 0.8);

    let technical = handle
        .service
        .handle(&SignalRequest::new("ETH", SignalType::Technical));
    assert!(technical.success);
    assert_eq!(handle.metrics.requests("ML", "success"), 1);
    assert_eq!(handle.metrics.requests("TECHNICAL", "success"), 1);

    // 4. Shutdown drops the tracked windows
    handle.shutdown().await;
    assert!(handle.store.symbols().is_empty());
    assert!(!handle.service.handle(&SignalRequest::new("BTC", SignalType::Ml)).success);
}

#[tokio::test]
async fn test_model_reload_swaps_or_keeps_previous() {
    let dir = tempfile::tempdir().unwrap();
    let bullish = write_artifact(&dir, "bullish.json", 2.0);
    let bearish = write_artifact(&dir, "bearish.json", -2.0);
    let missing = dir.path().join("missing.json");

    let model = Arc::new(assert_ok!(ModelInferenceEngine::load(&bullish)));
    let service = SignalService::new(
        Arc::new(CandleStore::new(500)),
        Arc::new(DonchianStrategy::new(Arc::new(strategy_config(&[5])))),
        model.clone(),
        Metrics::new().unwrap(),
    );
    service.store().initialize("BTC", walk(150)).unwrap();

    let before = service.handle(&SignalRequest::new("BTC", SignalType::Ml));
    assert_eq!(before.suggestion, Suggestion::Buy);

    // A failed reload leaves the active model in place
    let err = assert_err!(model.reload(&missing));
    assert!(matches!(err, SignalError::ArtifactNotFound { .. }));
    assert_eq!(model.metadata().path.as_deref(), Some(bullish.as_path()));

    let metadata = assert_ok!(model.reload(&bearish));
    assert_eq!(metadata.path.as_deref(), Some(bearish.as_path()));
    assert_eq!(metadata.feature_count, 17);

    let after = service.handle(&SignalRequest::new("BTC", SignalType::Ml));
    assert!(after.success);
    assert_eq!(after.suggestion, Suggestion::Hold);
}
