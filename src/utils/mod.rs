//! Utility modules for common functionality

pub mod signals;

pub use signals::spawn_signal_handlers;

// vim: ts=4
