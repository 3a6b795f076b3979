//! CLI command implementations.

mod analyze;
mod extract;
mod models;
mod verify;

pub use analyze::cmd_analyze;
pub use extract::cmd_extract;
pub use models::cmd_models;
pub use verify::cmd_verify;
