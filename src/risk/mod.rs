pub mod engine;
pub mod rules;
pub mod snapshot;
pub mod types;
