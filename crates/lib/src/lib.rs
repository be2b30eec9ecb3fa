//! pinsh-lib: core logic for pinsh
//!
//! This crate provides the provisioning pipeline behind the `pinsh` binary:
//! - `pins`: pin file loading, input resolution, and environment composition
//! - `store`: the local content-addressed store used as the default
//!   resolution engine
//! - `launch`: running commands and shells inside a provisioned environment
//! - `provision`: the load -> resolve -> compose pipeline

pub mod consts;
pub mod launch;
pub mod paths;
pub mod pins;
pub mod provision;
pub mod store;
