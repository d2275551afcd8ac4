// Scaffold Gateway - Library root for testing

pub mod code_parser;
pub mod config;
pub mod error;
pub mod http_client;
pub mod middleware;
pub mod models;
pub mod prompts;
pub mod providers;
pub mod routes;
pub mod template_generator;
pub mod templates;
pub mod workflow;
