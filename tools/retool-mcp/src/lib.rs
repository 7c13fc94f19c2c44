//! MCP server exposing the Retool management API as a set of typed tools.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infra;
pub mod shared;
