pub mod constants;
pub mod error_rules;
pub mod gateway;
pub mod health;
pub mod ingress;
pub mod logging;
pub mod main_helper;
pub mod media;
pub mod pipeline;
pub mod redaction;
pub mod reshape;
pub mod routes;
pub mod server;
pub mod specs;
pub mod str_utils;
pub mod types;
pub mod youtube;

pub use types::*;

pub use main_helper::{AppState, Args};
