//! End-to-end: an on-disk config, persona files, and corpus wired through
//! the pipeline, a SQLite store, and the HTTP gateway.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use doppel_agent::Pipeline;
use doppel_agent::test_helpers::{EchoProvider, SequentialMockProvider, make_text_response};
use doppel_config::AppConfig;
use doppel_core::{
    EventSink, FeedbackKind, Outcome, Provider, RelationshipKind, Role, TranscriptRecord, Turn,
};
use doppel_gateway::{GatewayState, build_router};
use doppel_store::Store;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn write_fixture(root: &Path) -> std::path::PathBuf {
    let data = root.join("data");
    let persona = root.join("persona");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::create_dir_all(&persona).unwrap();

    std::fs::write(
        data.join("hobbies.txt"),
        "Cameron enjoys rock climbing on weekends and plays chess online.",
    )
    .unwrap();
    std::fs::write(
        data.join("family_and_friends.txt"),
        "My girlfriend's name is Brianna or Bri.\n\
         My sister's name is Maya.\n\
         Colorado Friends: Kyle, Parisa (roommate)",
    )
    .unwrap();

    std::fs::write(
        persona.join("settings.txt"),
        "# test settings\ntemperature = 0.3\nhistory_limit = 4\nrag_top_k = 2\n",
    )
    .unwrap();
    std::fs::write(
        persona.join("system_prompt.txt"),
        "You are Cameron's digital twin. Keep it casual.",
    )
    .unwrap();

    let config_path = root.join("config.toml");
    let toml = format!(
        "provider = \"groq\"\n\
         model = \"test-model\"\n\
         api_key = \"test-key\"\n\
         \n\
         [persona]\n\
         owner_name = \"Cameron\"\n\
         data_dir = {data:?}\n\
         persona_dir = {persona:?}\n\
         extra_blocked_terms = [\"crypto\"]\n\
         \n\
         [gateway]\n\
         rate_limit_per_minute = 100\n\
         \n\
         [store]\n\
         backend = \"sqlite\"\n\
         path = {db:?}\n",
        data = data.display().to_string(),
        persona = persona.display().to_string(),
        db = root.join("db").join("doppel.db").display().to_string(),
    );
    std::fs::write(&config_path, toml).unwrap();
    config_path
}

async fn build(
    root: &Path,
    provider: Arc<dyn Provider>,
) -> (AppConfig, Pipeline, Arc<dyn Store>) {
    let config = AppConfig::load_from(&write_fixture(root)).unwrap();
    let store = doppel_store::open(&config.store).await.unwrap();
    let sink: Arc<dyn EventSink> = store.clone();
    let pipeline = Pipeline::from_config(&config, provider, sink).unwrap();
    (config, pipeline, store)
}

#[tokio::test]
async fn config_files_shape_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(SequentialMockProvider::single_text("Mostly bouldering lately!"));
    let (config, pipeline, _store) = build(dir.path(), provider.clone()).await;

    assert_eq!(config.model, "test-model");
    assert_eq!(pipeline.owner_name(), "Cameron");
    assert_eq!(pipeline.settings().history_limit, 4);
    assert_eq!(pipeline.roster().len(), 5);

    let history = vec![
        Turn::user("hi"),
        Turn::assistant("Hey! Who am I talking to?"),
    ];
    let result = pipeline
        .respond("does he still go rock climbing?", &history)
        .await;
    assert_eq!(result.outcome, Outcome::Done);
    assert!(result.context_used);

    let request = provider.last_request().unwrap();
    assert_eq!(request.model, "test-model");
    assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    assert!(request.messages[0].content.contains("Keep it casual."));
    assert!(request.messages[0].content.contains("rock climbing"));
}

#[tokio::test]
async fn extra_blocked_terms_come_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(SequentialMockProvider::new(vec![]));
    let (_config, pipeline, _store) = build(dir.path(), provider.clone()).await;

    let result = pipeline.respond("what does he think about crypto?", &[]).await;
    assert_eq!(result.outcome, Outcome::BlockedInput);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn identity_is_carried_across_a_stored_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let provider: Arc<dyn Provider> = Arc::new(EchoProvider::new());
    let (_config, pipeline, store) = build(dir.path(), provider).await;

    let conversation = "conv-e2e";
    let mut history = Vec::new();
    for message in ["hey it's Bri", "what's he up to this weekend?"] {
        let result = pipeline.respond_in(Some(conversation), message, &history).await;
        for (role, text) in [(Role::User, message), (Role::Assistant, result.text.as_str())] {
            store
                .record_turn(TranscriptRecord::now(conversation, role, text))
                .await
                .unwrap();
        }
        history.push(Turn::user(message));
        history.push(Turn::assistant(result.text.clone()));
    }

    let replayed = store.recent_turns(conversation, 10).await.unwrap();
    assert_eq!(replayed.len(), 4);
    assert_eq!(replayed[0].text, "hey it's Bri");

    let result = pipeline.respond_in(Some(conversation), "cool, thanks", &replayed).await;
    let identity = result.identity.expect("Bri should be recognized");
    assert_eq!(identity.name, "Bri");
    assert_eq!(identity.kind, RelationshipKind::Partner);
}

#[tokio::test]
async fn hedged_replies_land_in_the_sqlite_feedback_table() {
    let dir = tempfile::tempdir().unwrap();
    let provider: Arc<dyn Provider> = Arc::new(SequentialMockProvider::single_text(
        "Honestly, I'm not sure what his favorite movie is!",
    ));
    let (_config, pipeline, store) = build(dir.path(), provider).await;

    let result = pipeline
        .respond_in(Some("conv-gap"), "what's his favorite movie?", &[])
        .await;
    assert!(result.uncertain);

    let feedback = store.list_feedback().await.unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].record.kind, FeedbackKind::Unanswered);
    assert_eq!(feedback[0].record.user_message, "what's his favorite movie?");
    assert_eq!(feedback[0].record.conversation_id.as_deref(), Some("conv-gap"));
}

#[tokio::test]
async fn gateway_chat_persists_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let provider: Arc<dyn Provider> = Arc::new(SequentialMockProvider::new(vec![
        make_text_response("He plays chess online most nights."),
        make_text_response("Rock climbing, mostly on weekends."),
    ]));
    let (config, pipeline, store) = build(dir.path(), provider).await;

    let state = Arc::new(GatewayState::new(Arc::new(pipeline), store.clone(), true));
    let app = build_router(state, &config.gateway);

    for message in ["does he play chess?", "and rock climbing?"] {
        let body = serde_json::json!({
            "message": message,
            "conversation_id": "conv-http",
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["conversation_id"], "conv-http");
    }

    let transcript = store.transcript("conv-http").await.unwrap();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[2].text, "and rock climbing?");
    assert_eq!(transcript[3].text, "Rock climbing, mostly on weekends.");

    let conversations = store.conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].message_count, 4);
}
