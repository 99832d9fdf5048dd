//! Behaviour of the validated retry loop against a scripted model service.

use ai_chat_extract::request::repair_turn;
use ai_chat_extract::selection::{id_list_transform, Dataset, ID_LIST_GRAMMAR};
use ai_chat_extract::transport::ScriptedService;
use ai_chat_extract::{ChatEngine, ChatEngineBuilder, ChatOptions, Error, JsonMode, Message, MessageRole};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn engine(service: &Arc<ScriptedService>) -> ChatEngine {
    ChatEngineBuilder::new()
        .without_env()
        .with_service(service.clone())
        .build()
        .expect("engine")
}

fn question() -> Vec<Message> {
    vec![
        Message::system("Answer with a JSON array of IDs."),
        Message::user("Which fruits are red?"),
    ]
}

#[tokio::test]
async fn always_failing_transform_makes_retries_plus_one_invocations() {
    for retries in 0..4u32 {
        let service = Arc::new(ScriptedService::repeating(["[0]"]));
        let engine = engine(&service);

        let result = engine
            .chat_with(
                ChatOptions::new(question())
                    .json(JsonMode::Any)
                    .grammar(ID_LIST_GRAMMAR)
                    .retries(retries),
                |_: Value| Err::<(), _>("Wrong answer, try again.".to_string()),
            )
            .await;

        let err = assert_err!(result);
        match err {
            Error::RetriesExhausted { message, attempts } => {
                assert_eq!(message, "Wrong answer, try again.");
                assert_eq!(attempts, retries + 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(service.invocations(), retries as usize + 1);
    }
}

#[tokio::test]
async fn json_mode_stops_on_blank_chunk_after_complete_value() {
    let service = Arc::new(ScriptedService::new([vec!["[1,", "2]", " ", "3]", "\n"]]));
    let engine = engine(&service);

    let value = assert_ok!(
        engine
            .chat(
                ChatOptions::new(question())
                    .json(JsonMode::Any)
                    .grammar(ID_LIST_GRAMMAR)
            )
            .await
    );

    assert_eq!(value, json!([1, 2]));
    assert_eq!(service.chunks_pulled(), 3);
    assert_eq!(service.aborts(), 1);
}

#[tokio::test]
async fn blank_chunk_before_json_is_complete_does_not_stop() {
    let service = Arc::new(ScriptedService::new([vec!["{\"ids\":", " ", "[4]}"]]));
    let engine = engine(&service);

    let value = assert_ok!(engine.chat(ChatOptions::new(question()).json(JsonMode::Object)).await);

    assert_eq!(value, json!({"ids": [4]}));
    assert_eq!(service.chunks_pulled(), 3);
    assert_eq!(service.aborts(), 0);
}

#[tokio::test]
async fn length_overflow_is_fatal_and_consumes_no_retry() {
    let service = Arc::new(ScriptedService::repeating(["aaaa", "bbbb", "cccc"]));
    let engine = engine(&service);

    let result = engine
        .chat(ChatOptions::new(question()).max_length(6).retries(5))
        .await;

    let err = assert_err!(result);
    assert!(matches!(err, Error::LengthExceeded { limit: 6 }));
    assert_eq!(err.to_string(), "Response length exceeded");
    assert_eq!(service.invocations(), 1);
    assert_eq!(service.chunks_pulled(), 2);
    assert_eq!(service.aborts(), 1);
}

#[tokio::test]
async fn length_counts_characters_not_bytes() {
    let service = Arc::new(ScriptedService::new([vec!["ééé", "é"]]));
    let engine = engine(&service);

    let value = assert_ok!(engine.chat(ChatOptions::new(question()).max_length(4)).await);
    assert_eq!(value, Value::String("éééé".into()));
}

#[tokio::test]
async fn raw_text_is_exact_concatenation_without_transform() {
    let chunks = ["Hel", "lo", " ", "", "world", "\n"];
    let service = Arc::new(ScriptedService::new([chunks.to_vec()]));
    let engine = engine(&service);

    let value = assert_ok!(engine.chat(ChatOptions::new(question())).await);

    assert_eq!(value, Value::String(chunks.concat()));
    assert_eq!(service.chunks_pulled(), chunks.len());
    assert_eq!(service.aborts(), 0);
}

#[tokio::test]
async fn custom_stop_predicate_aborts_raw_stream() {
    let service = Arc::new(ScriptedService::new([vec!["one ", "two ", "STOP", " three"]]));
    let engine = engine(&service);

    let value = assert_ok!(
        engine
            .chat(ChatOptions::new(question()).stop_when(|chunk, _| chunk == "STOP"))
            .await
    );

    assert_eq!(value, Value::String("one two STOP".into()));
    assert_eq!(service.chunks_pulled(), 3);
    assert_eq!(service.aborts(), 1);
}

#[tokio::test]
async fn invalid_option_combinations_never_reach_the_service() {
    let service = Arc::new(ScriptedService::repeating(["[0]"]));
    let engine = engine(&service);

    let object_with_grammar = ChatOptions::new(question())
        .json(JsonMode::Object)
        .grammar(ID_LIST_GRAMMAR);
    let any_without_grammar = ChatOptions::new(question()).json(JsonMode::Any);
    let stop_with_json = ChatOptions::new(question())
        .json(JsonMode::Object)
        .stop_when(|_, _| false);

    for options in [object_with_grammar, any_without_grammar, stop_with_json] {
        let err = assert_err!(engine.chat(options).await);
        assert!(matches!(err, Error::Configuration { .. }), "{err:?}");
    }
    assert_eq!(service.invocations(), 0);
}

#[tokio::test]
async fn parse_failure_is_repaired_with_parser_diagnostic() {
    let service = Arc::new(ScriptedService::new([vec!["[1,"], vec!["[1]", "\n"]]));
    let engine = engine(&service);

    let (value, stats) = assert_ok!(
        engine
            .chat_with_stats(
                ChatOptions::new(question())
                    .json(JsonMode::Any)
                    .grammar(ID_LIST_GRAMMAR),
                Ok::<Value, String>,
            )
            .await
    );

    assert_eq!(value, json!([1]));
    assert_eq!(stats.attempts, 2);
    assert_eq!(stats.stopped_early, 1);

    let requests = service.requests();
    let repair = &requests[1].messages[2..];
    assert_eq!(repair[0], Message::assistant("[1,"));
    assert_eq!(repair[1].role, MessageRole::User);
    assert!(repair[1].content.contains("EOF"), "{}", repair[1].content);
}

#[tokio::test]
async fn every_retry_appends_one_repair_turn() {
    let service = Arc::new(ScriptedService::new([
        vec!["\"seven\""],
        vec!["\"seven\""],
        vec!["7"],
    ]));
    let engine = engine(&service);
    let diagnostic = "Answer with a number, not a word.";

    let value = assert_ok!(
        engine
            .chat_with(
                ChatOptions::new(question())
                    .json(JsonMode::Object)
                    .retries(3),
                |v: Value| v.as_u64().ok_or_else(|| diagnostic.to_string()),
            )
            .await
    );
    assert_eq!(value, 7);

    let requests = service.requests();
    assert_eq!(requests.len(), 3);
    let budgets: Vec<u32> = requests.iter().map(|r| r.retries_remaining).collect();
    assert_eq!(budgets, vec![3, 2, 1]);

    assert_eq!(requests[0].messages, question());
    assert_eq!(requests[1].messages[2..], repair_turn("\"seven\"", diagnostic));
    assert_eq!(requests[2].messages[2..4], requests[1].messages[2..4]);
    assert_eq!(requests[2].messages[4..], repair_turn("\"seven\"", diagnostic));
}

#[tokio::test]
async fn duplicate_ids_are_repaired_into_dataset_entries() {
    let dataset = Dataset::from_labels(["apple", "banana", "cherry"]);
    let service = Arc::new(ScriptedService::new([vec!["[1,1]", " "], vec!["[1,2]", "\n"]]));
    let engine = engine(&service);

    let selected = assert_ok!(
        engine
            .chat_with(
                ChatOptions::new(question())
                    .json(JsonMode::Any)
                    .grammar(ID_LIST_GRAMMAR),
                id_list_transform(&dataset),
            )
            .await
    );

    let labels: Vec<&str> = selected.iter().map(|s| s.entry.label.as_str()).collect();
    assert_eq!(labels, vec!["banana", "cherry"]);

    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    let repair = &requests[1].messages[2..];
    assert_eq!(repair[0], Message::assistant("[1,1] "));
    assert!(repair[1].content.contains("duplicate IDs: 1"));
}

#[tokio::test]
async fn model_defaults_come_from_engine_config() {
    let service = Arc::new(ScriptedService::new([vec!["ok"], vec!["ok"]]));
    let engine = ChatEngineBuilder::new()
        .without_env()
        .default_model("phi3")
        .default_retries(1)
        .with_service(service.clone())
        .build()
        .expect("engine");
    assert_eq!(engine.config().default_model, "phi3");
    assert_eq!(engine.config().default_retries, 1);

    assert_ok!(engine.chat(ChatOptions::new(question())).await);
    assert_ok!(engine.chat(ChatOptions::new(question()).model("mistral")).await);

    let requests = service.requests();
    assert_eq!(requests[0].model, "phi3");
    assert_eq!(requests[0].retries_remaining, 1);
    assert_eq!(requests[1].model, "mistral");
}
