pub mod config;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod services;
pub mod startup;
