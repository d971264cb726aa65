pub mod config;
pub mod heartbeat;
pub mod indexer;
pub mod message;
pub mod monitor;
pub mod notify;
pub mod pipeline;
pub mod risk;
pub mod state;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testutil;
