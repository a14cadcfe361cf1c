use aidevkit_common::crud::ObjectProvider;
use aidevkit_openai::{OpenAI, SpeechRequest};
use futures_util::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAI {
    OpenAI::builder()
        .api_key("sk-test")
        .base_url(server.uri())
        .build()
}

#[tokio::test]
async fn send_attaches_bearer_and_beta_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_beta_feature("assistants=v2");
    let request = client
        .chat()
        .model("gpt-4o-mini")
        .user_message("Hi")
        .build();
    let response = client.send(&request).await.expect("request succeeds");
    assert_eq!(response.content(), Some("Hello!"));
}

#[tokio::test]
async fn stream_sets_stream_field_and_collects_deltas() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = client.chat().model("gpt-4o-mini").user_message("Hi").build();
    let mut stream = client.stream(&request);

    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.expect("chunk parses");
        if let Some(delta) = chunk.choices.first().and_then(|c| c.delta.content.clone()) {
            text.push_str(&delta);
        }
    }
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn models_list_and_delete_through_crud_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [
                {"id": "gpt-4o-mini", "object": "model", "created": 1, "owned_by": "openai"},
                {"id": "gpt-4o", "object": "model", "created": 2, "owned_by": "openai"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/models/ft-custom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ft-custom", "object": "model", "deleted": true
        })))
        .mount(&server)
        .await;

    let models = client_for(&server).models();
    let page = models.list(&()).await.expect("list succeeds");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "gpt-4o-mini");

    models.delete("ft-custom").await.expect("delete succeeds");
}

#[tokio::test]
async fn model_create_is_an_unsupported_task() {
    let server = MockServer::start().await;
    let models = client_for(&server).models();
    let err = models.create(&()).await.unwrap_err();
    assert!(err.message.contains("model create failed"));
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn speech_decodes_pcm_response_and_writes_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![0x01, 0x00, 0xFF, 0x7F], "audio/pcm;rate=24000"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("tts/hello.pcm");
    let client = client_for(&server);
    let request = SpeechRequest::builder()
        .model("gpt-4o-mini-tts")
        .input("hello")
        .voice("alloy")
        .response_format("pcm")
        .build();

    let audio = client.speech(&request, Some(&out)).await.expect("decodes");
    match audio {
        aidevkit_common::audio::AudioData::Pcm {
            sample_rate,
            samples,
            ..
        } => {
            assert_eq!(sample_rate, 24_000);
            assert_eq!(samples, vec![1, i16::MAX]);
        }
        other => panic!("expected PCM audio, got {other:?}"),
    }
    assert!(out.exists());
}
