pub mod access;
pub mod agent;
pub mod client;
pub mod cluster;
pub mod error;
pub mod hardware;
pub mod params;
pub mod pool;
pub mod replication;
pub mod snapshot;
pub mod storage;
pub mod subscription;
pub mod system;
pub mod vm;

pub use client::{ApiMethod, Credentials, ProxmoxClient, Secret, Ticket};
pub use error::{ProxmoxError, Result};
pub use params::{BoolEncoding, Params, ToParams};
pub use vm::GuestType;
