pub mod format;
pub mod logging;
pub mod shutdown;
