pub mod format;
pub mod registry;
