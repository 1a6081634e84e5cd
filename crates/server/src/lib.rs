#![allow(clippy::collapsible_if)]
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod request;
pub mod routes;
pub mod scheduler;
pub mod state;
