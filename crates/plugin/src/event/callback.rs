//! Callback-based event handling

use crate::event::{CardEvent, ReaderEvent};

/// Trait for handling card events
pub trait CardEventHandler {
    /// Handle a card event
    fn handle_event(&mut self, event: CardEvent);
}

/// Trait for handling reader events
pub trait ReaderEventHandler {
    /// Handle a reader event
    fn handle_event(&mut self, event: ReaderEvent);
}

// Implement handlers for closures
impl<F> CardEventHandler for F
where
    F: FnMut(CardEvent),
{
    fn handle_event(&mut self, event: CardEvent) {
        self(event)
    }
}

impl<F> ReaderEventHandler for F
where
    F: FnMut(ReaderEvent),
{
    fn handle_event(&mut self, event: ReaderEvent) {
        self(event)
    }
}
