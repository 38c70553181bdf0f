pub mod config;
pub mod console;
pub mod conversion;
pub mod core;
pub mod csv_io;
pub mod languages;
pub mod persistence;
pub mod protocol;
pub mod registry;
pub mod session;


pub use crate::core::StudioError;
