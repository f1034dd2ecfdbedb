//! The process-wide default bus.
//!
//! Nothing is created implicitly at startup. The bus is built either
//! explicitly through [`init`], or with default settings by the first call
//! to [`instance`].

use signalbus_std::{EventBus, EventBusBuilder};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

static GLOBAL: OnceLock<EventBus> = OnceLock::new();

/// Name of the global bus when built by [`instance`].
pub const GLOBAL_BUS_NAME: &str = "global";

/// The global bus was already built.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("global event bus already initialized")]
pub struct AlreadyInitialized;

/// Build the global bus from `builder`.
///
/// Fails if the global bus already exists, including when an earlier call
/// to [`instance`] built it with default settings.
pub fn init(builder: EventBusBuilder) -> Result<&'static EventBus, AlreadyInitialized> {
    let mut built = false;
    let bus = GLOBAL.get_or_init(|| {
        built = true;
        builder.build()
    });
    if !built {
        return Err(AlreadyInitialized);
    }
    info!(bus = bus.name(), "Initialized global event bus");
    Ok(bus)
}

/// The global bus, built with default settings on first use.
pub fn instance() -> &'static EventBus {
    GLOBAL.get_or_init(|| EventBus::builder().name(GLOBAL_BUS_NAME).build())
}

/// The global bus, if it was built already.
pub fn try_instance() -> Option<&'static EventBus> {
    GLOBAL.get()
}
