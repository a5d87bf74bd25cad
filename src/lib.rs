pub mod app;
pub mod clients;
pub mod config;
pub mod drain;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod replay;
pub mod utils;
