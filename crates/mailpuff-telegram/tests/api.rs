//! Bot client against a local stand-in for the Bot API.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use mailpuff_telegram::{
    Bot, Error, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, SendMessage,
};

const TOKEN: &str = "123456-TESTTOKEN";

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn handle(
    State(recorder): State<Recorder>,
    Path((bot, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (axum::http::StatusCode, Json<Value>) {
    assert_eq!(bot, format!("bot{TOKEN}"));
    recorder
        .calls
        .lock()
        .unwrap()
        .push((method.clone(), body.clone()));

    match method.as_str() {
        "sendMessage" => (
            axum::http::StatusCode::OK,
            Json(json!({
                "ok": true,
                "result": {
                    "message_id": 501,
                    "chat": {"id": body["chat_id"], "type": "private"},
                    "date": 1_700_000_000,
                    "text": body["text"],
                }
            })),
        ),
        "editMessageReplyMarkup" => (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message to edit not found",
            })),
        ),
        "answerCallbackQuery" => (
            axum::http::StatusCode::OK,
            Json(json!({"ok": true, "result": true})),
        ),
        "getUpdates" => (
            axum::http::StatusCode::OK,
            Json(json!({
                "ok": true,
                "result": [{
                    "update_id": 10,
                    "callback_query": {
                        "id": "cb-1",
                        "from": {"id": 7, "is_bot": false, "first_name": "Ann"},
                        "data": "mark:abc"
                    }
                }]
            })),
        ),
        _ => (
            axum::http::StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error_code": 404, "description": "Not Found"})),
        ),
    }
}

async fn spawn_api() -> (Bot, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/{bot}/{method}", post(handle))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let bot = Bot::new(TOKEN)
        .with_base_url(&format!("http://{addr}"))
        .unwrap();
    (bot, recorder)
}

#[tokio::test]
async fn test_send_message_round_trip() {
    let (bot, recorder) = spawn_api().await;

    let request = SendMessage::new(99, "<b>Subject</b>")
        .parse_mode(ParseMode::Html)
        .without_link_preview()
        .reply_markup(InlineKeyboardMarkup::column([InlineKeyboardButton::url(
            "Open secure preview",
            "https://example.com/view?id=a&token=b",
        )]));
    let sent = bot.send_message(&request).await.unwrap();

    assert_eq!(sent.message_id, 501);
    assert_eq!(sent.chat.id, 99);

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (method, body) = &calls[0];
    assert_eq!(method, "sendMessage");
    assert_eq!(body["parse_mode"], "HTML");
    assert_eq!(
        body["reply_markup"]["inline_keyboard"][0][0]["text"],
        "Open secure preview"
    );
}

#[tokio::test]
async fn test_api_rejection_maps_to_error() {
    let (bot, _recorder) = spawn_api().await;

    let err = bot
        .edit_message_reply_markup(99, 1, &InlineKeyboardMarkup::default())
        .await
        .unwrap_err();
    match err {
        Error::Api { code, description } => {
            assert_eq!(code, 400);
            assert!(description.contains("not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_answer_callback_and_updates() {
    let (bot, recorder) = spawn_api().await;

    bot.answer_callback_query("cb-1", Some("Marked as read"))
        .await
        .unwrap();
    let updates = bot.get_updates(Some(10), 0).await.unwrap();

    assert_eq!(updates.len(), 1);
    let query = updates[0].callback_query.as_ref().unwrap();
    assert_eq!(query.data.as_deref(), Some("mark:abc"));

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls[0].1["text"], "Marked as read");
    assert_eq!(calls[1].1["offset"], 10);
    assert_eq!(calls[1].1["allowed_updates"], json!(["callback_query"]));
}

#[tokio::test]
async fn test_transport_error_hides_token() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bot = Bot::new(TOKEN)
        .with_base_url(&format!("http://{addr}"))
        .unwrap();
    let err = bot.answer_callback_query("x", None).await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert!(!err.to_string().contains(TOKEN));
}
