pub mod clock;
pub mod config;
pub mod insights;
pub mod models;
pub mod seed;
pub mod server;
pub mod sources;
pub mod store;
