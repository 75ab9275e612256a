//! HTTP front end for the SOA engine.

pub mod http;
pub mod schema;

pub use http::{run, HttpServerConfig};
