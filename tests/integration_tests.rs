//! Integration tests for the tarot relay server
//!
//! These drive the public router end to end with a recording generator in place of the API.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tarot_relay::generator::{Generation, GenerationError, GenerationRequest, TextGenerator};
use tarot_relay::settings::{ApiKey, GenerationProfile, Settings};
use tarot_relay::{AppState, CONCISE_PATH, DETAILED_PATH, build_router};
use tower::util::ServiceExt; // for oneshot()

#[derive(Debug, Clone, Default)]
struct RecordingGenerator {
    reply: Option<String>,
    seen: Arc<Mutex<Vec<(String, GenerationRequest)>>>,
}

impl RecordingGenerator {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_owned()),
            ..Self::default()
        }
    }

    fn seen(&self) -> Vec<(String, GenerationRequest)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: &GenerationRequest,
    ) -> Result<Generation, GenerationError> {
        self.seen
            .lock()
            .unwrap()
            .push((api_key.expose().to_owned(), request.clone()));
        Ok(self.reply.clone().map(Generation::text).unwrap_or_default())
    }
}

fn settings() -> Settings {
    Settings::builder()
        .api_key(ApiKey::new("sk-ant-integration"))
        .concise(GenerationProfile::new("claude-concise", 321))
        .detailed(GenerationProfile::new("claude-detailed", 4321))
        .build()
}

fn post(path: &str, body: Vec<u8>) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(path)
        .body(axum::body::Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn spread() -> serde_json::Value {
    json!([
        {
            "name": "愚者",
            "isReversed": false,
            "keywords": ["開始", "冒險"],
            "keywords_upright": ["開始", "冒險"],
            "keywords_reversed": ["魯莽"],
            "meaning_upright": "新的旅程",
            "meaning_reversed": "輕率"
        },
        {"name": "高塔", "isReversed": true, "keywords": ["劇變"]},
        {"name": "星星", "isReversed": false, "keywords": ["希望"]}
    ])
}

#[tokio::test]
async fn test_browser_flow_concise_then_detailed() {
    let generator = RecordingGenerator::replying("命運正在轉動。");
    let app = build_router(AppState::with_generator(settings(), generator.clone()));

    // The browser sends no content-type header and extra card fields
    let concise_body = json!({
        "topic": "事業",
        "question": "我該換工作嗎？",
        "drawn_cards": spread()
    });
    let response = app
        .clone()
        .oneshot(post(CONCISE_PATH, serde_json::to_vec(&concise_body).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let interpretation = json_body(response).await["interpretation"]
        .as_str()
        .unwrap()
        .to_owned();
    assert_eq!(interpretation, "命運正在轉動。");

    // The concise reading is passed back for the detailed one
    let mut detailed_body = concise_body;
    detailed_body["concise_interpretation"] = json!(interpretation);
    let response = app
        .oneshot(post(DETAILED_PATH, serde_json::to_vec(&detailed_body).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"advice": "命運正在轉動。"}));

    let seen = generator.seen();
    assert_eq!(seen.len(), 2);

    let (key, concise) = &seen[0];
    assert_eq!(key, "sk-ant-integration");
    assert_eq!(concise.model, "claude-concise");
    assert_eq!(concise.max_tokens, 321);
    assert!(concise.messages[0].content.contains("牌卡: 愚者 (正位)\n關鍵詞: 開始, 冒險"));
    assert!(concise.messages[0].content.contains("牌卡: 高塔 (逆位)"));
    assert!(!concise.messages[0].content.contains("魯莽"));

    let (_, detailed) = &seen[1];
    assert_eq!(detailed.model, "claude-detailed");
    assert_eq!(detailed.max_tokens, 4321);
    assert!(detailed.messages[0].content.contains("```\n命運正在轉動。\n```"));
}

#[tokio::test]
async fn test_method_is_checked_before_credential() {
    let generator = RecordingGenerator::replying("unused");
    let app = build_router(AppState::with_generator(Settings::builder().build(), generator.clone()));

    let request = axum::http::Request::builder()
        .method("GET")
        .uri(CONCISE_PATH)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await, json!({"error": "Method Not Allowed"}));

    // Without a key, even a malformed body answers 500 rather than 400
    let response = app
        .oneshot(post(DETAILED_PATH, b"{broken".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert!(generator.seen().is_empty());
}

#[tokio::test]
async fn test_empty_body_is_invalid_json() {
    let generator = RecordingGenerator::replying("unused");
    let app = build_router(AppState::with_generator(settings(), generator.clone()));

    let response = app.oneshot(post(CONCISE_PATH, Vec::new())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Invalid JSON in request body."})
    );
    assert!(generator.seen().is_empty());
}

#[tokio::test]
async fn test_generator_without_text_yields_fallback() {
    let generator = RecordingGenerator::default();
    let app = build_router(AppState::with_generator(settings(), generator));

    let body = json!({"topic": "愛情", "question": "他愛我嗎？", "drawn_cards": spread()});
    let response = app
        .oneshot(post(CONCISE_PATH, serde_json::to_vec(&body).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"interpretation": tarot_relay::prompts::CONCISE_FALLBACK})
    );
}
