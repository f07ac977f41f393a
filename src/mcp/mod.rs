//! MCP server: JSON-RPC 2.0 over newline-delimited stdio, plus the tool
//! dispatch table shared with the HTTP transport.

pub mod args;
pub mod tools;

mod access;
mod agent;
mod cluster;
mod guests;
mod node;
mod storage;

use crate::proxmox::{GuestType, ProxmoxClient, ProxmoxError, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Tool output is always a single text block.
fn text_result(text: String, is_error: bool) -> Value {
    let mut result = json!({ "content": [{ "type": "text", "text": text }] });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

pub(crate) fn pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(ProxmoxError::Json)
}

#[derive(Clone)]
pub struct McpServer {
    client: ProxmoxClient,
}

impl McpServer {
    pub fn new(client: ProxmoxClient) -> Self {
        Self { client }
    }

    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            debug!("Received: {}", input);

            if let Some(resp) = self.handle_message(input).await {
                let mut out = serde_json::to_string(&resp)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw JSON-RPC message. `None` means nothing should be
    /// sent back (a notification).
    pub async fn handle_message(&self, input: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(input) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to parse JSON-RPC: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(req) => self.handle_request(req).await,
            Err(e) => Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
            )),
        }
    }

    pub async fn handle_request(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let result = self.dispatch_method(&req.method, req.params).await;

        match req.id.filter(|id| !id.is_null()) {
            Some(id) => Some(match result {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::failure(id, e),
            }),
            None => {
                if let Err(e) = result {
                    warn!("Error handling notification {}: {}", req.method, e.message);
                }
                None
            }
        }
    }

    async fn dispatch_method(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                },
                "capabilities": {
                    "tools": {},
                    "resources": {}
                }
            })),
            "notifications/initialized" => {
                info!("Client initialized");
                Ok(Value::Null)
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => {
                let params = params.unwrap_or(Value::Null);
                let name = params
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tool name"))?;
                let args = params.get("arguments").unwrap_or(&Value::Null);
                self.call_tool(name, args).await
            }
            "resources/list" => Ok(json!({ "resources": resource_definitions() })),
            "resources/read" => {
                let uri = params
                    .as_ref()
                    .and_then(|p| p.get("uri"))
                    .and_then(|u| u.as_str())
                    .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing resource uri"))?;
                self.read_resource(uri).await
            }
            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        }
    }

    /// Handler failures are reported inside the result with `isError`, not
    /// as JSON-RPC errors. Only an unknown tool name is a protocol error.
    pub async fn call_tool(
        &self,
        name: &str,
        args: &Value,
    ) -> std::result::Result<Value, JsonRpcError> {
        let tool = tools::find(name).ok_or_else(|| {
            JsonRpcError::new(METHOD_NOT_FOUND, format!("Unknown tool: {}", name))
        })?;

        debug!("Calling tool {}", name);

        match self.run_tool(name, args).await {
            Ok(text) => Ok(text_result(text, false)),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                Ok(text_result(format!("Error {}: {}", tool.action, e), true))
            }
        }
    }

    async fn run_tool(&self, name: &str, args: &Value) -> Result<String> {
        match name {
            // Guests
            "list_vms" => self.list_vms().await,
            "list_containers" => self.list_containers().await,
            "get_vm_status" => self.get_vm_status(args).await,
            "start_vm" => self.power_action(args, "start", None).await,
            "stop_vm" => self.power_action(args, "stop", None).await,
            "shutdown_vm" => self.power_action(args, "shutdown", None).await,
            "reboot_vm" => self.power_action(args, "reboot", None).await,
            "suspend_vm" => self.power_action(args, "suspend", None).await,
            "resume_vm" => self.power_action(args, "resume", None).await,
            "start_container" => self.power_action(args, "start", Some(GuestType::Lxc)).await,
            "stop_container" => self.power_action(args, "stop", Some(GuestType::Lxc)).await,
            "shutdown_container" => {
                self.power_action(args, "shutdown", Some(GuestType::Lxc))
                    .await
            }
            "reboot_container" => self.power_action(args, "reboot", Some(GuestType::Lxc)).await,
            "reset_vm" => self.reset(args, GuestType::Qemu).await,
            "reset_container" => self.reset(args, GuestType::Lxc).await,
            "create_vm" => self.create_vm(args).await,
            "create_container" => self.create_container(args).await,
            "delete_vm" => self.delete_guest(args, GuestType::Qemu).await,
            "delete_container" => self.delete_guest(args, GuestType::Lxc).await,
            "get_vm_config" => self.get_vm_config(args).await,
            "update_vm_config" => self.update_vm_config(args).await,
            "update_container_resources" => self.update_container_resources(args).await,
            "resize_disk" => self.resize_disk(args).await,
            "add_disk" => self.add_disk(args).await,
            "remove_disk" => self.remove_disk(args).await,
            "add_network" => self.add_network(args).await,
            "remove_network" => self.remove_network(args).await,
            "set_vm_cloudinit" => self.set_vm_cloudinit(args).await,
            "add_tag" => self.add_tag(args).await,
            "remove_tag" => self.remove_tag(args).await,
            "set_tags" => self.set_tags(args).await,
            "clone_vm" => self.clone_guest(args).await,
            "migrate_vm" => self.migrate_guest(args).await,
            "get_console_url" => self.get_console_url(args),
            "list_snapshots" => self.list_snapshots(args).await,
            "snapshot_vm" => self.create_snapshot(args).await,
            "rollback_vm" => self.rollback_snapshot(args).await,
            "delete_snapshot" => self.delete_snapshot(args).await,
            "get_vm_stats" => self.get_vm_stats(args).await,

            // Storage
            "list_storage" => self.list_storage(args).await,
            "list_cluster_storage" => self.list_cluster_storage().await,
            "list_storage_content" => self.list_storage_content(args).await,
            "list_isos" => self.list_content_kind(args, "iso").await,
            "list_templates" => self.list_content_kind(args, "vztmpl").await,
            "add_storage" => self.add_storage(args).await,
            "update_storage" => self.update_storage(args).await,
            "delete_storage" => self.delete_storage(args).await,
            "download_url" => self.download_url(args).await,
            "delete_volume" => self.delete_volume(args).await,
            "list_backups" => self.list_backups(args).await,
            "create_backup" => self.create_backup(args).await,
            "restore_backup" => self.restore_backup(args).await,

            // Cluster
            "get_cluster_status" => self.get_cluster_status().await,
            "get_cluster_log" => self.get_cluster_log(args).await,
            "list_firewall_rules" => self.list_firewall_rules(args).await,
            "add_firewall_rule" => self.add_firewall_rule(args).await,
            "delete_firewall_rule" => self.delete_firewall_rule(args).await,
            "get_task_status" => self.get_task_status(args).await,
            "read_task_log" => self.read_task_log(args).await,
            "list_tasks" => self.list_tasks(args).await,
            "wait_for_task" => self.wait_for_task(args).await,
            "list_ha_resources" => self.list_ha_resources().await,
            "list_ha_groups" => self.list_ha_groups().await,
            "add_ha_resource" => self.add_ha_resource(args).await,
            "update_ha_resource" => self.update_ha_resource(args).await,
            "delete_ha_resource" => self.delete_ha_resource(args).await,
            "list_pools" => self.list_pools().await,
            "get_pool" => self.get_pool(args).await,
            "create_pool" => self.create_pool(args).await,
            "update_pool" => self.update_pool(args).await,
            "delete_pool" => self.delete_pool(args).await,
            "list_replication_jobs" => self.list_replication_jobs().await,
            "create_replication_job" => self.create_replication_job(args).await,
            "update_replication_job" => self.update_replication_job(args).await,
            "delete_replication_job" => self.delete_replication_job(args).await,

            // Access
            "list_users" => self.list_users().await,
            "create_user" => self.create_user(args).await,
            "delete_user" => self.delete_user(args).await,
            "list_roles" => self.list_roles().await,
            "create_role" => self.create_role(args).await,
            "update_role" => self.update_role(args).await,
            "delete_role" => self.delete_role(args).await,
            "list_acls" => self.list_acls().await,
            "update_acl" => self.update_acl(args).await,

            // Guest agent
            "vm_agent_ping" => self.agent_ping(args).await,
            "vm_agent_info" => self.agent_info(args).await,
            "vm_exec" => self.agent_exec(args).await,
            "vm_exec_status" => self.agent_exec_status(args).await,
            "vm_read_file" => self.agent_read_file(args).await,
            "vm_write_file" => self.agent_write_file(args).await,

            // Nodes
            "list_nodes" => self.list_nodes().await,
            "get_node_status" => self.get_node_status(args).await,
            "list_networks" => self.list_networks(args).await,
            "get_node_stats" => self.get_node_stats(args).await,
            "list_apt_updates" => self.list_apt_updates(args).await,
            "run_apt_update" => self.run_apt_update(args).await,
            "get_apt_versions" => self.get_apt_versions(args).await,
            "list_services" => self.list_services(args).await,
            "manage_service" => self.manage_service(args).await,
            "get_syslog" => self.get_syslog(args).await,
            "list_pci_devices" => self.list_pci_devices(args).await,
            "list_usb_devices" => self.list_usb_devices(args).await,
            "get_subscription" => self.get_subscription(args).await,
            "set_subscription" => self.set_subscription(args).await,
            "update_subscription" => self.update_subscription(args).await,

            _ => Err(ProxmoxError::invalid_params(format!(
                "No handler for tool {}",
                name
            ))),
        }
    }

    async fn read_resource(&self, uri: &str) -> std::result::Result<Value, JsonRpcError> {
        let text = match uri {
            "proxmox://vms" => self.client.get_all_vms().await.and_then(|v| pretty(&v)),
            "proxmox://nodes" => self.client.get_nodes().await.and_then(|v| pretty(&v)),
            _ => {
                return Err(JsonRpcError::new(
                    INVALID_PARAMS,
                    format!("Resource not found: {}", uri),
                ))
            }
        }
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))?;

        Ok(json!({
            "contents": [{
                "uri": uri,
                "mimeType": "application/json",
                "text": text
            }]
        }))
    }
}

fn resource_definitions() -> Vec<Value> {
    vec![
        json!({
            "uri": "proxmox://vms",
            "name": "List of VMs",
            "description": "A live list of all VMs and Containers",
            "mimeType": "application/json"
        }),
        json!({
            "uri": "proxmox://nodes",
            "name": "List of nodes",
            "description": "Cluster nodes with their status",
            "mimeType": "application/json"
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxmox::Credentials;

    /// Nothing listens on port 1, so any call that reaches the network fails
    /// fast with a transport error.
    fn offline_server() -> McpServer {
        let creds = Credentials::with_password("http://127.0.0.1:1", "root@pam", "pw");
        McpServer::new(ProxmoxClient::new(creds).unwrap())
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let resp = offline_server().handle_message("{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = offline_server();
        let msg = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(server.handle_message(msg).await.is_none());
    }

    #[tokio::test]
    async fn test_initialize_and_ping() {
        let server = offline_server();
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "pve-mcp");

        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, json!("a"));
        assert_eq!(resp.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let server = offline_server();
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"bogus"}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let err = server.call_tool("no_such_tool", &json!({})).await.unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_arguments_become_tool_errors() {
        let server = offline_server();
        let result = server
            .call_tool("start_vm", &json!({ "vmid": 100 }))
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error starting VM: Invalid parameters:"), "{}", text);
    }

    #[tokio::test]
    async fn test_every_listed_tool_has_a_handler() {
        let server = offline_server();
        for tool in tools::definitions() {
            if let Err(err) = server.run_tool(tool.name, &json!({})).await {
                assert!(
                    !err.to_string().contains("No handler for tool"),
                    "{} is listed but not dispatched",
                    tool.name
                );
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let server = offline_server();
        let err = server.read_resource("proxmox://nope").await.unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
    }
}
