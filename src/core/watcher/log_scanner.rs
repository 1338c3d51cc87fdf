// Line classification for the game-server log watcher.
//
// The game server announces a joinable session by printing a 6-digit code,
// and announces shutdown with a "shutting down" marker. The scanner turns
// raw appended lines into at-most-one event each, de-duplicating repeated
// codes and single-firing the shutdown notice until a new code appears.
// Tailing the file and posting to the webhook live in the infra layer.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

// ============================================================================
// EVENTS & PORT
// ============================================================================

/// An event worth forwarding to the configured webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A new session opened with the given 6-digit join code.
    SessionOpened { code: String },
    /// The server announced it is shutting down.
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook responded with status {0}")]
    BadStatus(u16),

    #[error("webhook request failed: {0}")]
    Transport(String),
}

/// Where matched events go. Delivery failures are the sink caller's problem
/// to log; they are never retried and never halt scanning.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &GameEvent) -> Result<(), DeliveryError>;
}

// ============================================================================
// SCANNER
// ============================================================================

fn session_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Exactly six digits - \b keeps longer digit runs from matching.
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{6})\b").unwrap())
}

fn shutdown_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)shutting down").unwrap())
}

/// Per-watched-file state: the last session code seen, and whether the
/// current session's shutdown has already been announced.
#[derive(Debug, Default)]
pub struct LogScanner {
    last_session_code: Option<String>,
    shutdown_notified: bool,
}

impl LogScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one appended line. Returns the event to forward, if any.
    pub fn scan_line(&mut self, line: &str) -> Option<GameEvent> {
        if let Some(captures) = session_code_pattern().captures(line) {
            let code = &captures[1];
            if self.last_session_code.as_deref() == Some(code) {
                return None;
            }

            self.last_session_code = Some(code.to_string());
            self.shutdown_notified = false;
            return Some(GameEvent::SessionOpened {
                code: code.to_string(),
            });
        }

        if shutdown_pattern().is_match(line) {
            if self.shutdown_notified {
                return None;
            }

            self.shutdown_notified = true;
            return Some(GameEvent::SessionClosed);
        }

        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
