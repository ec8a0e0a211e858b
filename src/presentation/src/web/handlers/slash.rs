//! `/k2sobot` slash command

use axum::{extract::State, http::StatusCode, Form};
use domain::entities::InboundEvent;
use serde::Deserialize;

use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    pub user_id: String,
    pub channel_id: String,
}

pub async fn slash_command(
    State(state): State<AppState>,
    Form(form): Form<SlashCommandForm>,
) -> StatusCode {
    tracing::info!(user_id = %form.user_id, channel = %form.channel_id, "slash command");
    state.dispatcher.dispatch(InboundEvent::SlashCommand {
        channel: form.channel_id,
        user: form.user_id,
    });
    StatusCode::OK
}
