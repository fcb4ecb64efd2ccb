//! git-lfs custom transfer protocol
//!
//! Inbound commands ([`messages`]), outbound events ([`events`]) and the
//! read loop that routes commands to the transfer controller ([`dispatch`]).

pub mod dispatch;
pub mod error;
pub mod events;
pub mod messages;

pub use dispatch::{Dispatcher, Termination};
pub use error::ProtocolError;
pub use events::Event;
pub use messages::{Command, Operation};

// vim: ts=4
