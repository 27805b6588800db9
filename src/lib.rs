pub mod salesforce;
pub mod requests;
pub mod pipeline;
pub mod config;
pub mod error;
pub mod utils;

pub use error::{Result, RemovalError};
pub use config::Config;
