pub mod api;
pub mod api_docs;
pub mod auth;
pub mod automation;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
