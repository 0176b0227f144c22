use dotenv::dotenv;
use snapcal::api_connection::{
    connection::ApiConnectionError,
    endpoints::{Provider, DEFAULT_GEMINI_MODEL},
};
use snapcal::fallback_estimator::FALLBACK_CONFIDENCE;
use snapcal::meal_parser::parse;
use snapcal::nutrition_estimator::{estimate, estimate_or_fallback};
use snapcal::unit_classifier::{FoodQuery, Quantity, UnitKind};
use std::env;

const LIVE_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

fn setup_test_environment() {
    dotenv().ok();
}

fn gemini_mock_path() -> String {
    format!("/v1beta/models/{}:generateContent", DEFAULT_GEMINI_MODEL)
}

fn roti_query() -> FoodQuery {
    FoodQuery {
        name: "roti".to_string(),
        quantity: Quantity::Amount(2.0),
        unit: UnitKind::Quantity,
    }
}

#[tokio::test]
async fn test_missing_api_key_error() {
    setup_test_environment();
    let provider = Provider::gemini("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    let result = provider.generate_text("Hello").await;
    assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    if let Err(ApiConnectionError::MissingApiKey(key_name)) = result {
        assert_eq!(key_name, "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    }
}

#[tokio::test]
async fn test_estimate_parses_prose_embedded_json() {
    setup_test_environment();
    const KEY_ENV: &str = "SNAPCAL_TEST_KEY_ESTIMATE_OK";
    unsafe {
        env::set_var(KEY_ENV, "test-key");
    }

    let mut server = mockito::Server::new_async().await;
    let inner_text = r#"Sure! Here is the estimate: {"nutrition": {"calories": 160, "protein": 5, "carbs": 28, "fat": 3, "fiber": 4, "sugar": 2}, "confidence": 0.8} Hope that helps."#;
    let body = serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": inner_text}]}}]
    })
    .to_string();
    let _mock = server
        .mock("POST", gemini_mock_path().as_str())
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let provider = Provider::gemini_with_base_url(KEY_ENV, &server.url());
    let result = estimate(&provider, &roti_query()).await;
    assert!(result.is_ok(), "estimate failed: {:?}", result.err());
    let estimate = result.unwrap();
    assert_eq!(estimate.calories, 160.0);
    assert_eq!(estimate.protein, 5.0);
    assert_eq!(estimate.sugar, Some(2.0));
    assert_eq!(estimate.confidence, 0.8);

    unsafe {
        env::remove_var(KEY_ENV);
    }
}

#[tokio::test]
async fn test_estimate_server_error_falls_back() {
    setup_test_environment();
    const KEY_ENV: &str = "SNAPCAL_TEST_KEY_ESTIMATE_500";
    unsafe {
        env::set_var(KEY_ENV, "test-key");
    }

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", gemini_mock_path().as_str())
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let provider = Provider::gemini_with_base_url(KEY_ENV, &server.url());
    let query = roti_query();
    let estimate = estimate_or_fallback(&provider, &query).await;
    // Two rotis at the roti-specific 80 kcal constant.
    assert_eq!(estimate.calories, 160.0);
    assert_eq!(estimate.confidence, FALLBACK_CONFIDENCE);

    unsafe {
        env::remove_var(KEY_ENV);
    }
}

#[tokio::test]
async fn test_estimate_invalid_content_falls_back() {
    setup_test_environment();
    const KEY_ENV: &str = "SNAPCAL_TEST_KEY_ESTIMATE_BAD";
    unsafe {
        env::set_var(KEY_ENV, "test-key");
    }

    let mut server = mockito::Server::new_async().await;
    let inner_text = r#"{"nutrition": {"calories": -50, "protein": 5, "carbs": 28, "fat": 3, "fiber": 4}, "confidence": 0.9}"#;
    let body = serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": inner_text}]}}]
    })
    .to_string();
    let _mock = server
        .mock("POST", gemini_mock_path().as_str())
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let provider = Provider::gemini_with_base_url(KEY_ENV, &server.url());
    let estimate = estimate_or_fallback(&provider, &roti_query()).await;
    assert_eq!(estimate.confidence, FALLBACK_CONFIDENCE);

    unsafe {
        env::remove_var(KEY_ENV);
    }
}

#[tokio::test]
async fn test_multi_item_parse_falls_back_on_server_error() {
    setup_test_environment();
    const KEY_ENV: &str = "SNAPCAL_TEST_KEY_PARSE_500";
    unsafe {
        env::set_var(KEY_ENV, "test-key");
    }

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", gemini_mock_path().as_str())
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let provider = Provider::gemini_with_base_url(KEY_ENV, &server.url());
    let items = parse(&provider, "pizza and coke").await;
    assert_eq!(items, vec!["pizza", "coke"]);

    unsafe {
        env::remove_var(KEY_ENV);
    }
}

#[tokio::test]
async fn test_multi_item_parse_uses_model_array() {
    setup_test_environment();
    const KEY_ENV: &str = "SNAPCAL_TEST_KEY_PARSE_OK";
    unsafe {
        env::set_var(KEY_ENV, "test-key");
    }

    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": "```json\n[\"dal makhani\", \"jeera rice\", \"lassi\"]\n```"}]}}]
    })
    .to_string();
    let _mock = server
        .mock("POST", gemini_mock_path().as_str())
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let provider = Provider::gemini_with_base_url(KEY_ENV, &server.url());
    let items = parse(&provider, "dal makhani with jeera rice and a lassi").await;
    assert_eq!(items, vec!["dal makhani", "jeera rice", "lassi"]);

    unsafe {
        env::remove_var(KEY_ENV);
    }
}

#[tokio::test]
async fn test_openai_provider_parses_choice_content() {
    setup_test_environment();
    const KEY_ENV: &str = "SNAPCAL_TEST_KEY_OPENAI_OK";
    unsafe {
        env::set_var(KEY_ENV, "test-key");
    }

    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {"role": "assistant", "content": "{\"acknowledged\": true}"},
            "finish_reason": "stop"
        }]
    })
    .to_string();
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let provider = Provider::openai_with_base_url(KEY_ENV, &server.url());
    let content = provider.generate_text("ping").await.unwrap();
    assert_eq!(content, "{\"acknowledged\": true}");

    unsafe {
        env::remove_var(KEY_ENV);
    }
}

#[tokio::test]
async fn test_vision_is_unsupported_on_openai_provider() {
    setup_test_environment();
    let provider = Provider::openai("SNAPCAL_TEST_KEY_OPENAI_VISION");
    let result = provider.generate_vision("describe", b"bytes", "image/jpeg").await;
    assert!(matches!(
        result,
        Err(ApiConnectionError::UnsupportedProvider(_))
    ));
}

#[tokio::test]
#[ignore]
async fn test_live_estimate_call() {
    setup_test_environment();
    if env::var(LIVE_API_KEY_ENV_VAR).is_err() {
        println!(
            "Skipping test_live_estimate_call: {} not set.",
            LIVE_API_KEY_ENV_VAR
        );
        return;
    }

    let provider = Provider::gemini(LIVE_API_KEY_ENV_VAR);
    let result = estimate(&provider, &roti_query()).await;
    assert!(result.is_ok(), "live estimate failed: {:?}", result.err());
    let estimate = result.unwrap();
    assert!(estimate.calories > 0.0);
    assert!(estimate.confidence >= 0.0 && estimate.confidence <= 1.0);
}
