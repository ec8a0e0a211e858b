//! Route definitions for the Axum server

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Slack Events API (mentions, direct messages, URL verification)
        .route("/slack/events", post(handlers::slack_events))
        // Block Kit menu selections
        .route("/interactions", post(handlers::interactions))
        // `/k2sobot` slash command
        .route("/k2sobot", post(handlers::slash_command))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::{ChatService, EventDispatcher, WizardService};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use domain::services::{ChatTransport, CommandOutput, CommandRunner, OutgoingMessage};
    use infrastructure::argocd::ArgoCdClient;
    use infrastructure::config::Config;
    use infrastructure::gemini_client::GeminiClient;
    use infrastructure::kubectl::KubectlClient;
    use infrastructure::stores::{InMemoryConversationStore, InMemorySelectionStore};
    use infrastructure::tools::CapabilityRegistry;
    use serde_json::{json, Value};
    use shared::types::MessageTs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<OutgoingMessage>>);

    #[async_trait]
    impl ChatTransport for Outbox {
        async fn post(&self, message: OutgoingMessage) -> shared::Result<Option<MessageTs>> {
            self.0.lock().unwrap().push(message);
            Ok(Some("1.0".to_string()))
        }

        async fn delete(&self, _channel: &str, _ts: &str) -> shared::Result<()> {
            Ok(())
        }
    }

    struct NoCluster;

    #[async_trait]
    impl CommandRunner for NoCluster {
        async fn run(
            &self,
            _program: &str,
            _args: &[String],
            _timeout: Duration,
        ) -> shared::Result<CommandOutput> {
            Ok(CommandOutput::failed(1, "no cluster"))
        }
    }

    fn app() -> (Router, Arc<Outbox>) {
        let config = Config::default();
        let outbox = Arc::new(Outbox::default());
        let runner: Arc<dyn CommandRunner> = Arc::new(NoCluster);
        let chat = ChatService::new(
            Arc::new(GeminiClient::new(&config.gemini).unwrap()),
            Arc::new(CapabilityRegistry::new(Duration::from_secs(1))),
            Arc::new(InMemoryConversationStore::new(10, 10)),
            config.gemini.system_prompt.clone(),
            Duration::from_secs(1),
        );
        let wizard = WizardService::new(
            Arc::new(InMemorySelectionStore::new(10, Duration::from_secs(60))),
            outbox.clone(),
            KubectlClient::new(runner.clone(), Duration::from_secs(1)),
            ArgoCdClient::new(runner, config.argocd.clone(), Duration::from_secs(1)),
            1000,
            Duration::from_secs(1),
        );
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::new(chat),
            Arc::new(wizard),
            outbox.clone(),
            Some("UBOT".to_string()),
        ));
        (create_router(AppState::new(dispatcher, false)), outbox)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Dispatched work runs on its own task; give it a moment to post.
    async fn settle(outbox: &Outbox, expected: usize) {
        for _ in 0..50 {
            if outbox.0.lock().unwrap().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn form(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "k2sobot");
        assert_eq!(body["gemini_available"], false);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_url_verification_echoes_challenge() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"type": "url_verification", "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P", "token": "x"}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["challenge"],
            "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"
        );
    }

    #[tokio::test]
    async fn test_mention_posts_command_menu() {
        let (app, outbox) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "type": "event_callback",
                    "event": {"type": "app_mention", "user": "U1", "channel": "C1", "text": "<@UBOT>"}
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        settle(&outbox, 1).await;
        let posts = outbox.0.lock().unwrap().clone();
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].blocks.as_ref().unwrap()[1]["elements"][0]["action_id"],
            "kubectl_command_select"
        );
    }

    #[tokio::test]
    async fn test_interaction_payload_advances_wizard() {
        let (app, outbox) = app();
        let payload = json!({
            "type": "block_actions",
            "user": {"id": "U1"},
            "channel": {"id": "C1"},
            "actions": [{
                "action_id": "kubectl_command_select",
                "selected_option": {"value": "argo"}
            }]
        });
        let body = format!(
            "payload={}",
            payload
                .to_string()
                .replace('%', "%25")
                .replace('&', "%26")
                .replace('+', "%2B")
                .replace(' ', "+")
        );
        let response = app.oneshot(form("/interactions", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        settle(&outbox, 1).await;
        let posts = outbox.0.lock().unwrap().clone();
        assert_eq!(
            posts[0].blocks.as_ref().unwrap()[1]["elements"][0]["action_id"],
            "kubectl_sub_command_select"
        );
    }

    #[tokio::test]
    async fn test_malformed_interaction_is_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(form("/interactions", "payload=not-json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_slash_command() {
        let (app, outbox) = app();
        let response = app
            .oneshot(form(
                "/k2sobot",
                "command=%2Fk2sobot&user_id=U1&channel_id=C9&text=".to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        settle(&outbox, 1).await;
        let posts = outbox.0.lock().unwrap().clone();
        assert_eq!(posts[0].channel, "C9");
    }
}
