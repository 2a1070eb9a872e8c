// presence-server/src/actors/mod.rs

pub mod connection;
pub mod presence_hub;
