//! HTTP surface for the Deuce block storage service: REST routes over vaults, blocks and files
//! (§6), mapped onto the domain model's errors via the status-code table in §7.
#[macro_use]
extern crate tracing;

pub mod api_server;
mod blocks;
pub mod context;
pub mod error;
mod files;
pub mod helpers;
mod pagination;
pub mod router;
mod vaults;

pub use error::Error;
