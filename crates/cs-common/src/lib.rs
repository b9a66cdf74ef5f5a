//! Courtside Common
//!
//! Infrastructure shared by the Courtside binaries.

pub mod logging;

pub use logging::init_logging;
