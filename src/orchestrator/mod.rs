//! Application-level orchestration.
//!
//! The controller owns the transport and runs every request on the runtime,
//! reporting settlements back to the presentation layer as events. UI layers
//! call into this module so they never block on the network.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
