//! State shared between the foreground loop and the tick handler.
//!
//! Owned by the process root behind an `Arc` and handed to both sides; there
//! are no globals.

use std::sync::Arc;

use crate::handoff::Handoff;
use crate::parameters::ParameterStore;
use crate::telemetry::Telemetry;

#[derive(Debug, Default)]
pub struct VentContext {
    pub handoff: Handoff,
    pub telemetry: Telemetry,
}

impl VentContext {
    pub fn new(store: ParameterStore) -> Arc<Self> {
        Arc::new(Self {
            handoff: Handoff::new(store),
            telemetry: Telemetry::default(),
        })
    }
}
