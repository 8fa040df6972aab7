pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod enrollment;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod portal;
pub mod state;
pub mod utils;
pub mod web;
