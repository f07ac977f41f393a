use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params};
use serde_json::Value;

fn agent_path(node: &str, vmid: u32, command: &str) -> String {
    format!("nodes/{}/qemu/{}/agent/{}", seg(node), vmid, command)
}

impl ProxmoxClient {
    pub async fn agent_ping(&self, node: &str, vmid: u32) -> Result<Value> {
        let path = agent_path(node, vmid, "ping");
        self.request_value(ApiMethod::Post, &path, None).await
    }

    /// Guest OS details reported by the agent.
    pub async fn agent_get(&self, node: &str, vmid: u32, command: &str) -> Result<Value> {
        let path = agent_path(node, vmid, command);
        self.request_value(ApiMethod::Get, &path, None).await
    }

    /// Starts `command` in the guest; returns `{ "pid": .. }`.
    pub async fn agent_exec(
        &self,
        node: &str,
        vmid: u32,
        command: &[String],
        input_data: Option<&str>,
    ) -> Result<Value> {
        let path = agent_path(node, vmid, "exec");
        let params = Params::new()
            .set("command", command.to_vec())
            .opt("input-data", input_data);
        self.request_value(ApiMethod::Post, &path, Some(&params))
            .await
    }

    pub async fn agent_exec_status(&self, node: &str, vmid: u32, pid: i64) -> Result<Value> {
        let path = agent_path(node, vmid, "exec-status");
        let params = Params::new().set("pid", pid);
        self.request_value(ApiMethod::Get, &path, Some(&params))
            .await
    }

    pub async fn agent_file_read(&self, node: &str, vmid: u32, file: &str) -> Result<Value> {
        let path = agent_path(node, vmid, "file-read");
        let params = Params::new().set("file", file);
        self.request_value(ApiMethod::Get, &path, Some(&params))
            .await
    }

    pub async fn agent_file_write(
        &self,
        node: &str,
        vmid: u32,
        file: &str,
        content: &str,
        encode: Option<bool>,
    ) -> Result<Value> {
        let path = agent_path(node, vmid, "file-write");
        let params = Params::new()
            .set("file", file)
            .set("content", content)
            .flag("encode", encode, BoolEncoding::Numeric);
        self.request_value(ApiMethod::Post, &path, Some(&params))
            .await
    }
}
