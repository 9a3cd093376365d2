pub mod auth;
pub mod budget;
pub mod calories;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod weight_import;

pub use error::{Error, Result};
