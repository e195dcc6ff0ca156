mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::{Request, StatusCode}};
use tower::ServiceExt;

use common::*;
use yolo_onnx_detect::adapters::artifact::annotator::ARTIFACT_FILE_NAME;
use yolo_onnx_detect::application::services::DetectSettings;

#[tokio::test]
async fn health_is_constant_and_side_effect_free() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub.clone(), dir.path(), DetectSettings::default());

    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, serde_json::json!({ "status": "ok" }));

    assert_eq!(stub.calls(), 0);
    assert!(!dir.path().join(ARTIFACT_FILE_NAME).exists());
    Ok(())
}

#[tokio::test]
async fn detect_filters_by_threshold_and_tallies() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub.clone(), dir.path(), DetectSettings::default());

    let res = app.oneshot(image_request(&png(640, 480, [90, 90, 90]), "image/png", Some("0.4"))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;

    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 3);
    for d in detections {
        assert!(d["score"].as_f64().unwrap() >= 0.4);
        assert!(vocab().contains(d["label"].as_str().unwrap()));
        assert_eq!(d["box"].as_array().unwrap().len(), 4);
    }
    // orden del modelo, no por score
    assert_eq!(detections[0]["label"], "person");
    assert_eq!(detections[1]["label"], "car");
    assert_eq!(detections[2]["label"], "person");

    let summary = json["summary"].as_object().unwrap();
    let total: u64 = summary.values().map(|v| v.as_u64().unwrap()).sum();
    assert_eq!(total as usize, detections.len());
    assert_eq!(summary["person"], 2);
    assert_eq!(summary["car"], 1);

    assert!(dir.path().join(ARTIFACT_FILE_NAME).is_file());
    Ok(())
}

#[tokio::test]
async fn summary_lists_labels_in_first_appearance_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub, dir.path(), DetectSettings::default());

    let res = app.oneshot(image_request(&png(64, 64, [0, 0, 0]), "image/png", Some("0.4"))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_text(res).await;
    assert!(body.ends_with(r#""summary":{"person":2,"car":1}}"#), "{body}");
    Ok(())
}

#[tokio::test]
async fn default_threshold_applies_when_field_missing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let settings = DetectSettings { default_threshold: 0.5, ..DetectSettings::default() };
    let app = build_app(stub, dir.path(), settings);

    let res = app.oneshot(image_request(&png(64, 64, [0, 0, 0]), "image/png", None)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["detections"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn blank_image_high_threshold_is_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub, dir.path(), DetectSettings::default());

    let res = app.oneshot(image_request(&png(640, 480, [255, 255, 255]), "image/png", Some("0.95"))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        serde_json::json!({ "detections": [], "summary": {} })
    );
    Ok(())
}

#[tokio::test]
async fn non_image_content_type_is_rejected_before_decode() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub.clone(), dir.path(), DetectSettings::default());

    // bytes válidos de PNG, pero anunciados como texto
    let res = app.oneshot(image_request(&png(8, 8, [1, 2, 3]), "text/plain", Some("0.25"))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(res).await,
        serde_json::json!({ "detail": "File provided is not an image" })
    );
    assert_eq!(stub.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn truncated_image_reports_decode_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub.clone(), dir.path(), DetectSettings::default());

    let full = png(32, 32, [10, 10, 10]);
    let res = app.oneshot(image_request(&full[..full.len() / 3], "image/png", None)).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let detail = body_json(res).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Invalid image file: "), "{detail}");
    assert!(detail.len() > "Invalid image file: ".len());
    assert_eq!(stub.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn inference_failure_hides_cause() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let app = build_app(Arc::new(FailingDetector { labels: vocab() }), dir.path(), DetectSettings::default());

    let res = app.oneshot(image_request(&png(16, 16, [0, 0, 0]), "image/jpeg", None)).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(res).await;
    assert_eq!(body, r#"{"detail":"Inference failed"}"#);
    assert!(!body.contains("CUDA"));
    assert!(!dir.path().join(ARTIFACT_FILE_NAME).exists());
    Ok(())
}

#[tokio::test]
async fn inference_deadline_maps_to_inference_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let detector = Arc::new(SlowDetector { labels: vocab(), delay: Duration::from_millis(800) });
    let settings = DetectSettings {
        inference_timeout: Some(Duration::from_millis(50)),
        ..DetectSettings::default()
    };
    let app = build_app(detector, dir.path(), settings);

    let res = app.oneshot(image_request(&png(16, 16, [0, 0, 0]), "image/png", None)).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await["detail"], "Inference failed");
    Ok(())
}

#[tokio::test]
async fn artifact_failure_does_not_change_response() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub, dir.path(), DetectSettings::default());
    // Un directorio en la ruta del artefacto hace fallar la escritura.
    std::fs::create_dir(dir.path().join(ARTIFACT_FILE_NAME))?;

    let res = app.oneshot(image_request(&png(64, 64, [5, 5, 5]), "image/png", Some("0.5"))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["detections"].as_array().unwrap().len(), 2);
    assert!(dir.path().join(ARTIFACT_FILE_NAME).is_dir());
    Ok(())
}

#[tokio::test]
async fn missing_image_and_bad_threshold_are_client_errors() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub.clone(), dir.path(), DetectSettings::default());

    let res = app
        .clone()
        .oneshot(multipart_request("/detect", &[FormPart::Text { name: "confidence_threshold", value: "0.3" }]))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["detail"], "Field 'image' is required");

    let res = app.oneshot(image_request(&png(8, 8, [0, 0, 0]), "image/png", Some("very"))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["detail"].as_str().unwrap().contains("confidence_threshold"));
    assert_eq!(stub.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn out_of_range_threshold_passes_through() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = Arc::new(StubDetector::new(sample_candidates()));
    let app = build_app(stub.clone(), dir.path(), DetectSettings::default());

    let res = app.clone().oneshot(image_request(&png(8, 8, [0, 0, 0]), "image/png", Some("-1"))).await?;
    assert_eq!(body_json(res).await["detections"].as_array().unwrap().len(), 4);

    let res = app.oneshot(image_request(&png(8, 8, [0, 0, 0]), "image/png", Some("1.5"))).await?;
    assert_eq!(body_json(res).await["detections"].as_array().unwrap().len(), 0);
    assert_eq!(stub.calls(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_do_not_mix_results() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let app = build_app(Arc::new(ColorDetector { labels: vocab() }), dir.path(), DetectSettings::default());

    let red = png(320, 240, [255, 0, 0]);
    let blue = png(100, 50, [0, 0, 255]);
    let (a, b) = tokio::join!(
        app.clone().oneshot(image_request(&red, "image/png", None)),
        app.clone().oneshot(image_request(&blue, "image/png", None)),
    );
    let (a, b) = (a?, b?);
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);

    let a = body_json(a).await;
    let b = body_json(b).await;
    assert_eq!(a["detections"][0]["label"], "person");
    assert_eq!(a["detections"][0]["box"], serde_json::json!([0.0, 0.0, 320.0, 240.0]));
    assert_eq!(a["summary"], serde_json::json!({ "person": 1 }));
    assert_eq!(b["detections"][0]["label"], "car");
    assert_eq!(b["detections"][0]["box"], serde_json::json!([0.0, 0.0, 100.0, 50.0]));
    assert_eq!(b["summary"], serde_json::json!({ "car": 1 }));

    // El artefacto existe y refleja una de las dos peticiones.
    let artifact = image::open(dir.path().join(ARTIFACT_FILE_NAME))?;
    assert!(matches!((artifact.width(), artifact.height()), (320, 240) | (100, 50)));
    Ok(())
}
