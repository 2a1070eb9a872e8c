// common/src/lib.rs
pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod utils;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::messages::*;
pub use crate::models::connection::{ConnectionId, ConnectionPhase, UserId};
pub use crate::utils::*;
