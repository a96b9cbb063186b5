// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::{Result, ScreenerError};
