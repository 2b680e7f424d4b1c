//! Per-user conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition(session, context, event)` returns the next session plus the
//! effects the runtime must execute. Voice API results come back as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{Attachment, Command, FlowContext};
pub use transition::transition;
