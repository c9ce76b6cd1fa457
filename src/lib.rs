//! Runner Agent - reports CI runner jobs and host identity to a controller.

pub mod agent;
pub mod config;
pub mod controller;
pub mod metadata;
pub mod models;
pub mod watcher;
