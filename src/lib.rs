pub mod cli;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod proxmox;
pub mod settings;

#[cfg(test)]
mod tests;
