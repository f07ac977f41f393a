use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::{ProxmoxError, Result};
use super::params::{BoolEncoding, Params, ToParams};
use serde_json::Value;
use std::time::{Duration, Instant};

const TASK_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Where a firewall rule lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallScope {
    Cluster,
    Node(String),
    Guest { node: String, vmid: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct FirewallRule {
    /// `in` or `out`
    pub direction: String,
    /// `ACCEPT`, `DROP` or `REJECT`
    pub action: String,
    pub source: Option<String>,
    pub dest: Option<String>,
    pub proto: Option<String>,
    pub dport: Option<String>,
    pub sport: Option<String>,
    pub iface: Option<String>,
    pub comment: Option<String>,
    pub enable: Option<bool>,
    pub pos: Option<u32>,
}

impl ToParams for FirewallRule {
    fn to_params(&self) -> Params {
        Params::new()
            .set("type", self.direction.as_str())
            .set("action", self.action.as_str())
            .opt("source", self.source.as_deref())
            .opt("dest", self.dest.as_deref())
            .opt("proto", self.proto.as_deref())
            .opt("dport", self.dport.as_deref())
            .opt("sport", self.sport.as_deref())
            .opt("iface", self.iface.as_deref())
            .opt("comment", self.comment.as_deref())
            .flag("enable", self.enable, BoolEncoding::Numeric)
            .opt("pos", self.pos)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HaResourceOptions {
    pub state: Option<String>,
    pub group: Option<String>,
    pub max_restart: Option<u32>,
    pub max_relocate: Option<u32>,
    pub comment: Option<String>,
}

impl ToParams for HaResourceOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("state", self.state.as_deref())
            .opt("group", self.group.as_deref())
            .opt("max_restart", self.max_restart)
            .opt("max_relocate", self.max_relocate)
            .opt("comment", self.comment.as_deref())
    }
}

/// Outcome of waiting on a task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub exit_status: String,
    pub status: Value,
}

impl ProxmoxClient {
    pub async fn get_cluster_status(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "cluster/status", None).await
    }

    pub async fn get_cluster_log(&self, limit: Option<u64>) -> Result<Vec<Value>> {
        let params = Params::new().opt("max", limit);
        self.request(ApiMethod::Get, "cluster/log", Some(&params))
            .await
    }

    async fn firewall_rules_path(&self, scope: &FirewallScope) -> Result<String> {
        Ok(match scope {
            FirewallScope::Cluster => "cluster/firewall/rules".to_string(),
            FirewallScope::Node(node) => format!("nodes/{}/firewall/rules", seg(node)),
            FirewallScope::Guest { node, vmid } => {
                let (_, guest) = self.find_vm_location(*vmid).await?;
                format!("nodes/{}/{}/{}/firewall/rules", seg(node), guest, vmid)
            }
        })
    }

    pub async fn get_firewall_rules(&self, scope: &FirewallScope) -> Result<Vec<Value>> {
        let path = self.firewall_rules_path(scope).await?;
        self.request(ApiMethod::Get, &path, None).await
    }

    pub async fn add_firewall_rule(&self, scope: &FirewallScope, rule: &FirewallRule) -> Result<Value> {
        let path = self.firewall_rules_path(scope).await?;
        self.request_value(ApiMethod::Post, &path, Some(&rule.to_params()))
            .await
    }

    pub async fn delete_firewall_rule(&self, scope: &FirewallScope, pos: u32) -> Result<Value> {
        let path = format!("{}/{}", self.firewall_rules_path(scope).await?, pos);
        self.request_value(ApiMethod::Delete, &path, None).await
    }

    // --- Tasks ---

    pub async fn get_task_status(&self, node: &str, upid: &str) -> Result<Value> {
        let path = format!("nodes/{}/tasks/{}/status", seg(node), seg(upid));
        self.request_value(ApiMethod::Get, &path, None).await
    }

    pub async fn get_task_log(&self, node: &str, upid: &str, limit: Option<u64>) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/tasks/{}/log", seg(node), seg(upid));
        let params = Params::new().opt("limit", limit);
        self.request(ApiMethod::Get, &path, Some(&params)).await
    }

    pub async fn list_tasks(
        &self,
        node: &str,
        limit: Option<u64>,
        vmid: Option<u32>,
        errors_only: Option<bool>,
    ) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/tasks", seg(node));
        let params = Params::new()
            .opt("limit", limit)
            .opt("vmid", vmid)
            .flag("errors", errors_only, BoolEncoding::Numeric);
        self.request(ApiMethod::Get, &path, Some(&params)).await
    }

    /// Polls the task status until it reports `stopped` or `timeout` passes.
    pub async fn wait_for_task(&self, node: &str, upid: &str, timeout: Duration) -> Result<TaskResult> {
        let started = Instant::now();
        loop {
            let status = self.get_task_status(node, upid).await?;
            if status.get("status").and_then(|v| v.as_str()) == Some("stopped") {
                let exit_status = status
                    .get("exitstatus")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                return Ok(TaskResult {
                    exit_status,
                    status,
                });
            }

            if started.elapsed() + TASK_POLL_INTERVAL > timeout {
                return Err(ProxmoxError::Timeout(format!(
                    "task {} still running after {}s",
                    upid,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(TASK_POLL_INTERVAL).await;
        }
    }

    // --- HA Management ---

    pub async fn get_ha_resources(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "cluster/ha/resources", None)
            .await
    }

    pub async fn get_ha_groups(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "cluster/ha/groups", None).await
    }

    pub async fn add_ha_resource(&self, sid: &str, opts: &HaResourceOptions) -> Result<Value> {
        let params = Params::new().set("sid", sid).merge(opts.to_params());
        self.request_value(ApiMethod::Post, "cluster/ha/resources", Some(&params))
            .await
    }

    pub async fn update_ha_resource(&self, sid: &str, opts: &HaResourceOptions) -> Result<Value> {
        let path = format!("cluster/ha/resources/{}", seg(sid));
        self.request_value(ApiMethod::Put, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn delete_ha_resource(&self, sid: &str) -> Result<Value> {
        let path = format!("cluster/ha/resources/{}", seg(sid));
        self.request_value(ApiMethod::Delete, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_firewall_rule_params() {
        let rule = FirewallRule {
            direction: "in".into(),
            action: "ACCEPT".into(),
            proto: Some("tcp".into()),
            dport: Some("22".into()),
            enable: Some(true),
            ..Default::default()
        };
        assert_eq!(
            rule.to_params().to_json(),
            json!({ "type": "in", "action": "ACCEPT", "proto": "tcp", "dport": "22", "enable": "1" })
        );
    }
}
