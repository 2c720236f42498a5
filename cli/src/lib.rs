//! Library side of the `vaultgraph` binary: configuration, vault scanning
//! and subcommands.

pub mod commands;
pub mod config;
pub mod vault;

pub use commands::Workspace;
pub use config::VaultGraphConfig;
pub use vault::Vault;
