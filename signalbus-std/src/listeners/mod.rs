//! Standard listener implementations.

pub mod logging;

pub use logging::SystemEventLogger;
