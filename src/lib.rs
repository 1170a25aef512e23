pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod gui;
pub mod models;
pub mod store;
