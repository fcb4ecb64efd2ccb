//! Transfer execution: the controller and the progress-counting I/O wrappers

pub mod controller;
pub mod progress;

pub use controller::Controller;
pub use progress::{Callback, ProgressObserver, ProgressReader, ProgressReporter, ProgressWriter};

// vim: ts=4
