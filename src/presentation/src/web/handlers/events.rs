//! Slack Events API endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::entities::InboundEvent;
use serde_json::{json, Value};
use tracing::debug;

use crate::web::state::AppState;

pub async fn slack_events(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    match body["type"].as_str() {
        Some("url_verification") => {
            let challenge = body["challenge"].as_str().unwrap_or_default();
            Json(json!({ "challenge": challenge })).into_response()
        }
        Some("event_callback") => {
            match parse_event(&body["event"]) {
                Some(event) => {
                    state.dispatcher.dispatch(event);
                }
                None => debug!(event_type = ?body["event"]["type"].as_str(), "ignoring event"),
            }
            StatusCode::OK.into_response()
        }
        other => {
            debug!(envelope = ?other, "ignoring envelope");
            StatusCode::OK.into_response()
        }
    }
}

fn text_field(event: &Value, key: &str) -> Option<String> {
    event[key].as_str().map(str::to_string)
}

/// Map an Events API `event` object onto the bot's inbound events.
pub fn parse_event(event: &Value) -> Option<InboundEvent> {
    match event["type"].as_str()? {
        "app_mention" => {
            if event.get("subtype").is_some_and(|s| !s.is_null()) {
                return None;
            }
            Some(InboundEvent::Mention {
                channel: text_field(event, "channel")?,
                user: text_field(event, "user")?,
            })
        }
        "message" => Some(InboundEvent::Message {
            channel: text_field(event, "channel")?,
            user: text_field(event, "user"),
            text: text_field(event, "text").unwrap_or_default(),
            subtype: text_field(event, "subtype"),
            bot_id: text_field(event, "bot_id"),
        }),
        _ => None,
    }
}
