//! Embedding dispatch against mock upstreams

mod common;

use common::{config, entry};
use parallm::{Client, EmbeddingOutput, Error, ProviderEntry, ProviderFamily};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn single_text_yields_a_single_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}],
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })))
        .mount(&server)
        .await;

    let client =
        Client::new(config(vec![entry(ProviderFamily::OpenAi, &server.uri(), 20)])).unwrap();

    let output = client.embed("hello world").await.unwrap();
    assert_eq!(output, EmbeddingOutput::Single(vec![0.1, 0.2, 0.3]));

    // The request carried the rewritten path and the default encoding.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["input"], "hello world");
    assert_eq!(body["encoding_format"], "float");
}

#[tokio::test]
async fn batch_texts_come_back_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [2.0]},
                {"index": 0, "embedding": [1.0]}
            ],
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })))
        .mount(&server)
        .await;

    let client =
        Client::new(config(vec![entry(ProviderFamily::SiliconFlow, &server.uri(), 20)])).unwrap();

    let output = client.embed(vec!["a".to_string(), "b".to_string()]).await.unwrap();
    assert_eq!(output, EmbeddingOutput::Batch(vec![vec![1.0], vec![2.0]]));
}

#[tokio::test]
async fn google_embeddings_use_the_model_path_and_values_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/test-model:embedContent"))
        .and(body_partial_json(json!({"model": "models/test-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": {"values": [0.5, 0.6]}
        })))
        .mount(&server)
        .await;

    let google = ProviderEntry {
        family: ProviderFamily::Google,
        api_key: "g-key".to_string(),
        api_base: server.uri(),
        model: "test-model".to_string(),
        rate_limit: 20,
    };
    let client = Client::new(config(vec![google])).unwrap();

    let output = client.embed("text").await.unwrap();
    assert_eq!(output, EmbeddingOutput::Single(vec![0.5, 0.6]));
}

#[tokio::test]
async fn chat_only_families_never_serve_embeddings() {
    let server = MockServer::start().await;
    let anthropic = ProviderEntry {
        family: ProviderFamily::Anthropic,
        api_key: "k".to_string(),
        api_base: server.uri(),
        model: "claude-3-5-haiku-20241022".to_string(),
        rate_limit: 20,
    };
    let client = Client::new(config(vec![anthropic])).unwrap();

    let err = client.embed("text").await.unwrap_err();
    assert!(matches!(err, Error::NoProvidersAvailable));
    assert!(server.received_requests().await.unwrap().is_empty());
}
