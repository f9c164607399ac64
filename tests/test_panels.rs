mod common;

use axum::http::StatusCode;
use comiccraft::config::setup_logging;
use comiccraft::constants::{DEFAULT_CAPTION, DEFAULT_VISUAL_PROMPT};
use comiccraft::error::StudioError;
use comiccraft::panels::generate_panels;
use comiccraft::settings::Settings;
use common::{Canned, closed_base_url, configured_settings, fake_api};

const STORY: &str = "A cat finds a lost key and returns it to the old lighthouse keeper.";

#[tokio::test]
async fn missing_configuration_makes_no_request() {
    let _ = setup_logging(true);
    let api = fake_api(Canned::chat("[]"), Canned::image("unused")).await;
    let http = reqwest::Client::new();

    let no_key = Settings {
        api_key: String::new(),
        ..api.settings()
    };
    let err = generate_panels(&http, STORY, &no_key).await.unwrap_err();
    assert!(matches!(err, StudioError::Configuration(_)), "{err:?}");

    let no_model = Settings {
        text_model: "  ".to_string(),
        ..api.settings()
    };
    let err = generate_panels(&http, STORY, &no_model).await.unwrap_err();
    assert!(matches!(err, StudioError::Configuration(_)), "{err:?}");

    assert_eq!(api.hits(), 0);
}

#[tokio::test]
async fn plain_array_becomes_panels() {
    let _ = setup_logging(true);
    let reply = r#"[{"caption":"A","visual_prompt":"p1"},{"caption":"B","visual_prompt":"p2"}]"#;
    let api = fake_api(Canned::chat(reply), Canned::image("unused")).await;

    let panels = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap();
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[0].caption, "A");
    assert_eq!(panels[1].visual_prompt, "p2");
    assert!(panels.iter().all(|p| p.image_url.is_none() && !p.is_loading));
    assert_ne!(panels[0].id, panels[1].id);

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert_eq!(body["model"], "text-endpoint");
    assert_eq!(body["stream"], false);
    assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(
        body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains(STORY)
    );
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer test-key")
    );
}

#[tokio::test]
async fn fenced_reply_with_prose_is_recovered() {
    let _ = setup_logging(true);
    let reply = "Here you go:\n```json\n[{\"caption\":\"X\",\"visual_prompt\":\"Y\"}]\n```\nEnjoy!";
    let api = fake_api(Canned::chat(reply), Canned::image("unused")).await;

    let panels = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap();
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0].caption, "X");
    assert_eq!(panels[0].visual_prompt, "Y");
}

#[tokio::test]
async fn missing_fields_get_defaults() {
    let _ = setup_logging(true);
    let api = fake_api(
        Canned::chat(r#"[{"visual_prompt":"Z"},{"caption":""}]"#),
        Canned::image("unused"),
    )
    .await;

    let panels = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap();
    assert_eq!(panels[0].caption, DEFAULT_CAPTION);
    assert_eq!(panels[0].visual_prompt, "Z");
    assert_eq!(panels[1].caption, DEFAULT_CAPTION);
    assert_eq!(panels[1].visual_prompt, DEFAULT_VISUAL_PROMPT);
}

#[tokio::test]
async fn truncated_reply_is_a_parse_error() {
    let _ = setup_logging(true);
    let api = fake_api(
        Canned::chat(r#"[{"caption":"A","visual_prompt":"#),
        Canned::image("unused"),
    )
    .await;

    let err = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn missing_content_is_a_parse_error() {
    let _ = setup_logging(true);
    let api = fake_api(
        Canned::ok(serde_json::json!({"choices": []})),
        Canned::image("unused"),
    )
    .await;

    let err = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn api_error_carries_server_message() {
    let _ = setup_logging(true);
    let api = fake_api(
        Canned::api_error(StatusCode::UNAUTHORIZED, "Invalid key"),
        Canned::image("unused"),
    )
    .await;

    let err = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap_err();
    match err {
        StudioError::Api(message) => assert_eq!(message, "Invalid key"),
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn api_error_without_message_reports_status() {
    let _ = setup_logging(true);
    let api = fake_api(
        Canned::raw(StatusCode::SERVICE_UNAVAILABLE, "down"),
        Canned::image("unused"),
    )
    .await;

    let err = generate_panels(&reqwest::Client::new(), STORY, &api.settings())
        .await
        .unwrap_err();
    match err {
        StudioError::Api(message) => {
            assert!(message.contains("503"), "{message}");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_api_is_a_network_error() {
    let _ = setup_logging(true);
    let settings = configured_settings(&closed_base_url().await);

    let err = generate_panels(&reqwest::Client::new(), STORY, &settings)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Network(_)), "{err:?}");
    assert!(err.to_string().contains("cross-origin"));
}
