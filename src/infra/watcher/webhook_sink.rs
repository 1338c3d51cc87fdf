// Webhook sink - posts game-server events to a configured Discord webhook.

use crate::core::watcher::{DeliveryError, EventSink, GameEvent};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

/// Minimal webhook poster. A plain POST without `?wait` - Discord answers
/// 204 No Content on success, and anything else counts as a delivery failure.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    fn render(event: &GameEvent) -> String {
        match event {
            GameEvent::SessionOpened { code } => {
                format!("🎮 Servidor aberto! Código da sessão: **{code}**")
            }
            GameEvent::SessionClosed => "🛑 Servidor encerrado.".to_string(),
        }
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    async fn deliver(&self, event: &GameEvent) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "content": Self::render(event) }))
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(DeliveryError::BadStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_with_the_session_code() {
        let opened = GameEvent::SessionOpened {
            code: "123456".to_string(),
        };
        assert!(WebhookSink::render(&opened).contains("123456"));

        let closed = GameEvent::SessionClosed;
        assert!(WebhookSink::render(&closed).contains("encerrado"));
    }
}
