// src/protocol/mod.rs
// Wyoming wire protocol: event model, frame codec and message helpers

pub mod codec;
pub mod event;
pub mod messages;

pub use codec::{encode, read_event, write_event};
pub use event::Event;
pub use messages::{Inbound, ReplyKind};
