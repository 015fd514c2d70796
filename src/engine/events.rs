//! Event channel between the hunt worker and its consumer.
//!
//! The worker never logs directly; it emits events over an mpsc channel and
//! whoever owns the receiver (the headless main loop, a status UI) decides
//! what to do with them. Keeps cross-thread notification out of the engine.

use chrono::{DateTime, Local};
use std::sync::mpsc::{channel, Receiver, Sender};

use super::state::HuntState;

/// One notification from the hunt worker.
#[derive(Debug, Clone)]
pub enum HuntEvent {
    /// Human-readable progress line.
    Log { at: DateTime<Local>, message: String },
    /// The machine moved to a new state.
    StateChanged { at: DateTime<Local>, state: HuntState },
}

impl HuntEvent {
    pub fn log(message: impl Into<String>) -> Self {
        HuntEvent::Log { at: Local::now(), message: message.into() }
    }

    pub fn state_changed(state: HuntState) -> Self {
        HuntEvent::StateChanged { at: Local::now(), state }
    }
}

/// Creates the event channel. Unbounded: a slow consumer queues events
/// rather than stalling the hunt.
pub fn event_channel() -> (Sender<HuntEvent>, Receiver<HuntEvent>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (tx, rx) = event_channel();
        tx.send(HuntEvent::log("first")).unwrap();
        tx.send(HuntEvent::state_changed(HuntState::OpenPanel)).unwrap();

        match rx.recv().unwrap() {
            HuntEvent::Log { message, .. } => assert_eq!(message, "first"),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().unwrap() {
            HuntEvent::StateChanged { state, .. } => assert_eq!(state, HuntState::OpenPanel),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
