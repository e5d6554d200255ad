//! HTTP API: catalog admin routes and request/response mapping.

pub mod app;
pub mod middleware;
