pub mod config;
pub mod connector;
pub mod lister;
pub mod render;

pub use lister::{run, AppError};
