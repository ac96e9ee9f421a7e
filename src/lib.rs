pub mod blocks;
pub mod cache;
pub mod common;
pub mod config;
pub mod errors;
pub mod files;
pub mod includes;
pub mod markup;
pub mod views;

pub mod database;
pub mod services;

#[cfg(feature = "server")]
pub mod server;
