//! Interactive component payloads (menu selections)

use axum::{extract::State, http::StatusCode, Form};
use domain::entities::InboundEvent;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

pub async fn interactions(
    State(state): State<AppState>,
    Form(form): Form<InteractionForm>,
) -> StatusCode {
    let payload: Value = match serde_json::from_str(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "interaction payload is not JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    match parse_selection(&payload) {
        Some(event) => {
            state.dispatcher.dispatch(event);
        }
        None => debug!("interaction without a usable selection"),
    }
    StatusCode::OK
}

/// The first action of a `block_actions` payload, as a wizard selection.
pub fn parse_selection(payload: &Value) -> Option<InboundEvent> {
    let action = payload["actions"].get(0)?;
    let value = action["selected_option"]["value"]
        .as_str()
        .or_else(|| action["value"].as_str())?;
    Some(InboundEvent::Selection {
        channel: payload["channel"]["id"].as_str()?.to_string(),
        user: payload["user"]["id"].as_str().map(str::to_string),
        action_id: action["action_id"].as_str()?.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_static_select() {
        let event = parse_selection(&json!({
            "type": "block_actions",
            "user": {"id": "U1"},
            "channel": {"id": "C1"},
            "actions": [{
                "action_id": "kubectl_namespace_select",
                "selected_option": {"text": {"type": "plain_text", "text": "default"}, "value": "default"}
            }]
        }))
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::Selection {
                channel: "C1".to_string(),
                user: Some("U1".to_string()),
                action_id: "kubectl_namespace_select".to_string(),
                value: "default".to_string(),
            }
        );
    }

    #[test]
    fn test_payload_without_channel_or_actions() {
        assert!(parse_selection(&json!({"actions": []})).is_none());
        assert!(parse_selection(&json!({
            "actions": [{"action_id": "argo_app_select", "selected_option": {"value": "guestbook"}}]
        }))
        .is_none());
    }
}
