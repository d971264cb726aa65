pub mod chain;
pub mod cursor;
pub mod decoder;
pub mod gateway;
pub mod types;
