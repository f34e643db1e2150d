//! Endpoint handler modules for the colada HTTP API.

pub mod clients;
pub mod publico;
pub mod ventas;
