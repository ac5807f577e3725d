#[macro_use]
extern crate tracing;

pub mod domain;
pub mod error;
mod key;
pub mod reassembly;
pub mod store;

pub use domain::Vault;
pub use error::Error;
pub use store::MetadataStore;
