#[macro_use]
extern crate tracing;

pub mod config;
pub mod context;
pub mod error;
pub mod time;
