//! Integration test: full lifecycle (prepare → train → select → serve)

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cardio_mlops::data::{prepare_dataset, RawSource};
use cardio_mlops::server::{create_router, ServerConfig, ServiceContext};
use cardio_mlops::tracking::{ExperimentTracker, TrackingConfig};
use cardio_mlops::training::{TrainingConfig, TrainingPipeline};
use tower::ServiceExt;

/// Deterministic raw rows in the UCI layout, `num` in 0..=4
fn raw_rows(n: usize) -> String {
    (0..n)
        .map(|i| {
            let num = if i % 2 == 0 { 0 } else { 1 + i % 4 };
            let sick = (num > 0) as usize as f64;
            let thal = if i % 17 == 0 { "?".to_string() } else { format!("{:.1}", 3.0 + sick * 4.0) };
            format!(
                "{:.1},{:.1},{:.1},{:.1},{:.1},0.0,{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},{},{}",
                40.0 + sick * 15.0 + (i % 9) as f64,
                (i % 2) as f64,
                1.0 + sick * 3.0,
                120.0 + sick * 20.0 + (i % 7) as f64,
                200.0 + sick * 40.0 + (i % 13) as f64,
                (i % 3) as f64,
                170.0 - sick * 35.0 - (i % 8) as f64,
                sick,
                sick * 2.0 + (i % 4) as f64 * 0.3,
                1.0 + sick,
                sick * 2.0,
                thal,
                num
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_prepare_train_serve() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("raw.data");
    std::fs::write(&raw_path, raw_rows(120)).unwrap();
    let dataset = dir.path().join("heart.csv");

    let summary = prepare_dataset(&RawSource::File(raw_path), &dataset).await.unwrap();
    assert_eq!(summary.raw_rows, 120);
    assert!(summary.dropped_rows > 0);

    let tracking = TrackingConfig::new(dir.path().join("mlruns").display().to_string(), "lifecycle");
    let tracker = ExperimentTracker::from_config(&tracking).unwrap();
    let report = TrainingPipeline::new(TrainingConfig::default().with_n_estimators(30), tracker)
        .with_experiment_name("lifecycle")
        .run(&dataset)
        .unwrap();
    assert_eq!(report.n_failed(), 0);
    let best_auc = report.best().and_then(|r| r.metrics.as_ref()).unwrap().roc_auc;

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        log_inference: false,
    };
    let ctx = ServiceContext::load(&tracking, config).unwrap();
    let served = report.runs.iter().find(|r| r.run_id == ctx.run_id).unwrap();
    assert_eq!(served.metrics.as_ref().unwrap().roc_auc, best_auc);

    let app = create_router(Arc::new(ctx));
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"age":63,"sex":1,"trestbps":145,"chol":233,"thalach":150}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
