use super::args::{
    self, AgentInfoArgs, ExecArgs, ExecStatusArgs, FileReadArgs, FileWriteArgs, VmArgs,
};
use super::{pretty, McpServer};
use crate::proxmox::{ProxmoxError, Result};
use serde_json::Value;

/// Read-only agent commands exposed through `vm_agent_info`.
pub const INFO_COMMANDS: &[&str] = &[
    "info",
    "get-osinfo",
    "get-host-name",
    "get-fsinfo",
    "get-memory-blocks",
    "get-time",
    "get-timezone",
    "get-users",
    "get-vcpus",
    "network-get-interfaces",
];

impl McpServer {
    pub(super) async fn agent_ping(&self, args: &Value) -> Result<String> {
        let a: VmArgs = args::parse(args)?;
        self.client.agent_ping(&a.node, a.vmid).await?;
        Ok("Pong".to_string())
    }

    pub(super) async fn agent_info(&self, args: &Value) -> Result<String> {
        let a: AgentInfoArgs = args::parse(args)?;
        if !INFO_COMMANDS.contains(&a.command.as_str()) {
            return Err(ProxmoxError::invalid_params(format!(
                "unsupported agent command '{}'",
                a.command
            )));
        }
        let res = self.client.agent_get(&a.node, a.vmid, &a.command).await?;
        pretty(&res)
    }

    pub(super) async fn agent_exec(&self, args: &Value) -> Result<String> {
        let a: ExecArgs = args::parse(args)?;
        let command = a.command.into_argv();
        if command.is_empty() {
            return Err(ProxmoxError::invalid_params("command is empty"));
        }
        let res = self
            .client
            .agent_exec(&a.node, a.vmid, &command, a.input_data.as_deref())
            .await?;
        pretty(&res)
    }

    pub(super) async fn agent_exec_status(&self, args: &Value) -> Result<String> {
        let a: ExecStatusArgs = args::parse(args)?;
        let res = self
            .client
            .agent_exec_status(&a.node, a.vmid, a.pid)
            .await?;
        pretty(&res)
    }

    pub(super) async fn agent_read_file(&self, args: &Value) -> Result<String> {
        let a: FileReadArgs = args::parse(args)?;
        let res = self.client.agent_file_read(&a.node, a.vmid, &a.file).await?;
        pretty(&res)
    }

    pub(super) async fn agent_write_file(&self, args: &Value) -> Result<String> {
        let a: FileWriteArgs = args::parse(args)?;
        self.client
            .agent_file_write(&a.node, a.vmid, &a.file, &a.content, a.encode)
            .await?;
        Ok("File written".to_string())
    }
}
