//! Message and MessageHandler
#![warn(missing_docs)]
pub mod types;
pub use types::*;

pub mod handlers;
pub use handlers::HandleMsg;
