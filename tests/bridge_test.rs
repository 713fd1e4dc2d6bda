//! Bridge integration tests against stub front-end endpoints

mod common;

use common::mock_transcriber::MockTranscriber;
use common::{spawn_broadcast_stub, spawn_mic_stub};
use serde_json::Value;
use stagelink::avatar::{AvatarBridge, EmotionMap, ExpressionId, ModelDescriptor};
use stagelink::config::Config;
use stagelink::error::StageError;
use stagelink::session::Session;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

fn test_model() -> ModelDescriptor {
    ModelDescriptor {
        name: "shizuku-test".to_string(),
        url: "http://frontend/shizuku.model.json".to_string(),
        emotion_map: EmotionMap::from([
            ("anger".to_string(), ExpressionId::Index(2)),
            ("joy".to_string(), ExpressionId::Index(3)),
        ]),
    }
}

/// Unwrap the double encoding: the stub hands us the outer POST body
/// `{"message": <string>}`; the inner string is the event JSON.
async fn next_event(rx: &mut UnboundedReceiver<Value>) -> Value {
    let body = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for a broadcast")
        .expect("Broadcast stub channel closed");
    let message = body["message"]
        .as_str()
        .expect("Outer envelope must carry a JSON-encoded string");
    serde_json::from_str(message).expect("Inner message must be valid JSON")
}

#[tokio::test]
async fn test_send_text_wire_shape() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;
    let bridge = AvatarBridge::new(test_model(), &base_url);

    bridge.send_text("hello viewers").await;

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "full-text");
    assert_eq!(event["text"], "hello viewers");
}

#[tokio::test]
async fn test_speaking_signals_in_order() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;
    let bridge = AvatarBridge::new(test_model(), &base_url);

    bridge.start_speaking().await;
    bridge.stop_speaking().await;

    let first = next_event(&mut rx).await;
    assert_eq!(first["type"], "control");
    assert_eq!(first["text"], "speaking-start");

    let second = next_event(&mut rx).await;
    assert_eq!(second["text"], "speaking-stop");
}

#[tokio::test]
async fn test_set_expression_broadcasts_mapped_id() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;
    let bridge = AvatarBridge::new(test_model(), &base_url);

    // lookup is case-insensitive
    bridge.set_expression("JOY").await.unwrap();

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "expression");
    assert_eq!(event["text"], 3);
}

#[tokio::test]
async fn test_set_expression_unknown_key_is_lookup_error() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;
    let bridge = AvatarBridge::new(test_model(), &base_url);

    let err = bridge.set_expression("smirk").await.unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(err, StageError::ExpressionNotFound(key) if key == "smirk"));

    // nothing was broadcast
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_connect_announces_model_with_absolute_url() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;

    let mut dict = tempfile::NamedTempFile::new().unwrap();
    write!(
        dict,
        r#"[{{"name":"stub-model","url":"/assets/m.json","emotionMap":{{"JOY":3}}}}]"#
    )
    .unwrap();

    let config = Config {
        base_url: base_url.clone(),
        model_dict_path: dict.path().to_string_lossy().to_string(),
        avatar_model: "stub-model".to_string(),
        ..Config::default()
    };

    let bridge = AvatarBridge::connect(&config).await.unwrap();
    assert_eq!(bridge.model().url, format!("{}/assets/m.json", base_url));

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "set-model");
    assert_eq!(event["text"]["name"], "stub-model");
    assert_eq!(event["text"]["url"], format!("{}/assets/m.json", base_url));
    // keys are lowercased at load
    assert_eq!(event["text"]["emotionMap"]["joy"], 3);
}

#[tokio::test]
async fn test_connect_unknown_model_is_fatal() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;

    let mut dict = tempfile::NamedTempFile::new().unwrap();
    write!(dict, r#"[{{"name":"other","url":"/m.json","emotionMap":{{}}}}]"#).unwrap();

    let config = Config {
        base_url,
        model_dict_path: dict.path().to_string_lossy().to_string(),
        avatar_model: "missing-model".to_string(),
        ..Config::default()
    };

    let err = AvatarBridge::connect(&config).await.unwrap_err();
    assert!(err.is_fatal());

    // selection failed before anything was announced
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_expression_queue_dispatches_in_map_order() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;
    let bridge = AvatarBridge::new(test_model(), &base_url);

    // text order is joy-then-anger; map (sorted) order wins
    bridge.queue_expressions_from_text("[joy] and then [ANGER]", Duration::from_millis(20));

    let first = next_event(&mut rx).await;
    assert_eq!(first["type"], "expression");
    assert_eq!(first["text"], 2);

    let second = next_event(&mut rx).await;
    assert_eq!(second["text"], 3);
}

#[tokio::test]
async fn test_session_turn_end_to_end() {
    let (base_url, mut rx) = spawn_broadcast_stub().await;
    let ws_url = spawn_mic_stub(vec![
        r#"{"type":"mic-audio","audio":[0.1,0.2,0.3]}"#.to_string(),
        r#"{"type":"mic-audio","audio":{"1":0.5,"0":0.4}}"#.to_string(),
        r#"{"type":"mic-audio-end"}"#.to_string(),
    ])
    .await;

    let bridge = AvatarBridge::new(test_model(), &base_url).with_capture_url(&ws_url);
    let transcriber = MockTranscriber::with_phrase("Hello [joy] world!");
    let received = transcriber.received_handle();

    let session = Session::new(bridge, Box::new(transcriber), Duration::from_millis(10));

    let displayed = session.run_turn().await.unwrap();
    assert_eq!(displayed.as_deref(), Some("Hello  world!"));

    // the transcriber saw every captured sample exactly once
    assert_eq!(*received.lock().unwrap(), vec![5]);

    // delivery starts with the speaking signal
    let first = next_event(&mut rx).await;
    assert_eq!(first["type"], "control");
    assert_eq!(first["text"], "speaking-start");

    // the rest: expression (from the worker), full-text, speaking-stop;
    // the worker interleaves, so only relative order of the main line is
    // guaranteed
    let mut rest = Vec::new();
    for _ in 0..3 {
        rest.push(next_event(&mut rx).await);
    }

    let expression = rest
        .iter()
        .find(|e| e["type"] == "expression")
        .expect("expression event");
    assert_eq!(expression["text"], 3);

    let full_text_pos = rest
        .iter()
        .position(|e| e["type"] == "full-text")
        .expect("full-text event");
    assert_eq!(rest[full_text_pos]["text"], "Hello  world!");

    let stop_pos = rest
        .iter()
        .position(|e| e["type"] == "control")
        .expect("speaking-stop event");
    assert_eq!(rest[stop_pos]["text"], "speaking-stop");
    assert!(full_text_pos < stop_pos);
}
