//! Outbound half of the front-end connection.
//!
//! Messages are serialised here and queued on an unbounded channel; the
//! session's WebSocket writer task drains the channel in order.  Queueing
//! never blocks, so a handler can send an event and then its response and be
//! sure they reach the front end in that order.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::application::ports::FrontendChannel;
use crate::domain::messages::{Event, Response};

/// A [`FrontendChannel`] that queues JSON text for the WebSocket writer.
pub struct FrontendSink {
    tx: mpsc::UnboundedSender<String>,
    session_id: String,
}

impl FrontendSink {
    pub fn new(tx: mpsc::UnboundedSender<String>, session_id: impl Into<String>) -> Self {
        Self {
            tx,
            session_id: session_id.into(),
        }
    }

    fn enqueue<T: Serialize>(&self, message: &T) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!("session {}: JSON serialization error: {e}", self.session_id);
                return;
            }
        };
        if self.tx.send(text).is_err() {
            debug!("session {}: front end gone; message dropped", self.session_id);
        }
    }
}

impl FrontendChannel for FrontendSink {
    fn send_response(&self, response: Response) {
        self.enqueue(&response);
    }

    fn send_event(&self, event: Event) {
        self.enqueue(&event);
    }
}
