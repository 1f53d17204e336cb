//! Mid-loop guidance injection.
//!
//! A long-running turn (several tool-call iterations deep) has no natural
//! point for a human or a supervising agent to interject without cancelling
//! and restarting it. [`Steering`] gives the loop a cheap checkpoint:
//! before each provider call, drain any pending messages and fold them into
//! the next user turn instead of waiting for the current tool batch to
//! finish and the whole step to end.

use tokio::sync::mpsc;

/// A single piece of injected guidance.
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringMessage {
    /// Free-form text folded into the next provider turn, e.g. "focus on
    /// the auth module" or "stop, that file is wrong".
    pub text: String,
}

/// The sending half is handed to whatever can observe the step is still
/// running (an admin command, a signal from another agent); the receiving
/// half is polled by the loop between tool batches.
pub struct Steering {
    rx: mpsc::UnboundedReceiver<SteeringMessage>,
}

/// A handle to send steering messages into a running loop.
#[derive(Clone)]
pub struct SteeringHandle {
    tx: mpsc::UnboundedSender<SteeringMessage>,
}

impl Steering {
    /// Create a connected (handle, receiver) pair.
    pub fn new() -> (SteeringHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SteeringHandle { tx }, Self { rx })
    }

    /// Drain every message queued so far without blocking. Returns an
    /// empty vec if nothing is pending or the handle side has dropped.
    pub fn drain(&mut self) -> Vec<SteeringMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl SteeringHandle {
    /// Queue a steering message. Returns an error if the loop's receiver
    /// has already been dropped (the step ended).
    pub fn send(&self, text: impl Into<String>) -> Result<(), SteeringSendError> {
        self.tx
            .send(SteeringMessage { text: text.into() })
            .map_err(|_| SteeringSendError)
    }
}

/// The receiving loop has already ended; the message was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("steering receiver has dropped")]
pub struct SteeringSendError;

impl Default for Steering {
    fn default() -> Self {
        Self::new().1
    }
}
