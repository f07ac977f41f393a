use super::args::{
    self, AddFirewallRuleArgs, DeleteFirewallRuleArgs, FirewallScopeArgs, HaResourceArgs, IdArgs,
    LimitArgs, ListTasksArgs, PoolArgs, ReplicationArgs, SidArgs, TaskArgs, UpdatePoolArgs,
    UpdateReplicationArgs, WaitTaskArgs,
};
use super::{pretty, McpServer};
use crate::proxmox::cluster::{FirewallRule, FirewallScope, HaResourceOptions};
use crate::proxmox::pool::PoolUpdate;
use crate::proxmox::replication::{ReplicationJob, ReplicationUpdate};
use crate::proxmox::Result;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TASK_TIMEOUT_SECS: u64 = 60;

impl McpServer {
    pub(super) async fn get_cluster_status(&self) -> Result<String> {
        let status = self.client.get_cluster_status().await?;
        pretty(&status)
    }

    pub(super) async fn get_cluster_log(&self, args: &Value) -> Result<String> {
        let a: LimitArgs = args::parse(args)?;
        let log = self.client.get_cluster_log(a.limit).await?;
        pretty(&log)
    }

    /// No node and no vmid means cluster level. A vmid without a node is
    /// looked up.
    async fn firewall_scope(&self, node: Option<String>, vmid: Option<u32>) -> Result<FirewallScope> {
        Ok(match (node, vmid) {
            (None, None) => FirewallScope::Cluster,
            (Some(node), None) => FirewallScope::Node(node),
            (Some(node), Some(vmid)) => FirewallScope::Guest { node, vmid },
            (None, Some(vmid)) => {
                let (node, _) = self.client.find_vm_location(vmid).await?;
                FirewallScope::Guest { node, vmid }
            }
        })
    }

    pub(super) async fn list_firewall_rules(&self, args: &Value) -> Result<String> {
        let a: FirewallScopeArgs = args::parse(args)?;
        let scope = self.firewall_scope(a.node, a.vmid).await?;
        let rules = self.client.get_firewall_rules(&scope).await?;
        pretty(&rules)
    }

    pub(super) async fn add_firewall_rule(&self, args: &Value) -> Result<String> {
        let a: AddFirewallRuleArgs = args::parse(args)?;
        let scope = self.firewall_scope(a.node, a.vmid).await?;
        let rule = FirewallRule {
            direction: a.direction,
            action: a.action,
            source: a.source,
            dest: a.dest,
            proto: a.proto,
            dport: a.dport,
            sport: a.sport,
            iface: a.iface,
            comment: a.comment,
            enable: a.enable,
            pos: a.pos,
        };
        self.client.add_firewall_rule(&scope, &rule).await?;
        Ok(format!(
            "Firewall rule added ({} {})",
            rule.direction, rule.action
        ))
    }

    pub(super) async fn delete_firewall_rule(&self, args: &Value) -> Result<String> {
        let a: DeleteFirewallRuleArgs = args::parse(args)?;
        let scope = self.firewall_scope(a.node, a.vmid).await?;
        self.client.delete_firewall_rule(&scope, a.pos).await?;
        Ok(format!("Firewall rule at position {} deleted", a.pos))
    }

    pub(super) async fn get_task_status(&self, args: &Value) -> Result<String> {
        let a: TaskArgs = args::parse(args)?;
        let status = self.client.get_task_status(&a.node, &a.upid).await?;
        pretty(&status)
    }

    /// Log lines only, without the line numbers Proxmox wraps them in.
    pub(super) async fn read_task_log(&self, args: &Value) -> Result<String> {
        let a: TaskArgs = args::parse(args)?;
        let entries = self
            .client
            .get_task_log(&a.node, &a.upid, a.limit)
            .await?;

        let mut log_text = String::new();
        for entry in entries {
            if let Some(line) = entry.get("t").and_then(|v| v.as_str()) {
                log_text.push_str(line);
                log_text.push('\n');
            }
        }
        Ok(log_text)
    }

    pub(super) async fn list_tasks(&self, args: &Value) -> Result<String> {
        let a: ListTasksArgs = args::parse(args)?;
        let tasks = self
            .client
            .list_tasks(&a.node, a.limit, a.vmid, a.errors)
            .await?;
        pretty(&tasks)
    }

    pub(super) async fn wait_for_task(&self, args: &Value) -> Result<String> {
        let a: WaitTaskArgs = args::parse(args)?;
        let timeout = Duration::from_secs(a.timeout.unwrap_or(DEFAULT_TASK_TIMEOUT_SECS));
        let result = self
            .client
            .wait_for_task(&a.node, &a.upid, timeout)
            .await?;
        Ok(format!(
            "Task finished with status: {}\nFull details:\n{}",
            result.exit_status,
            pretty(&result.status)?
        ))
    }

    // --- HA ---

    pub(super) async fn list_ha_resources(&self) -> Result<String> {
        let resources = self.client.get_ha_resources().await?;
        pretty(&resources)
    }

    pub(super) async fn list_ha_groups(&self) -> Result<String> {
        let groups = self.client.get_ha_groups().await?;
        pretty(&groups)
    }

    fn ha_options(a: HaResourceArgs) -> (String, HaResourceOptions) {
        let opts = HaResourceOptions {
            state: a.state,
            group: a.group,
            max_restart: a.max_restart,
            max_relocate: a.max_relocate,
            comment: a.comment,
        };
        (a.sid, opts)
    }

    pub(super) async fn add_ha_resource(&self, args: &Value) -> Result<String> {
        let (sid, opts) = Self::ha_options(args::parse(args)?);
        self.client.add_ha_resource(&sid, &opts).await?;
        Ok(format!("HA resource {} added", sid))
    }

    pub(super) async fn update_ha_resource(&self, args: &Value) -> Result<String> {
        let (sid, opts) = Self::ha_options(args::parse(args)?);
        self.client.update_ha_resource(&sid, &opts).await?;
        Ok(format!("HA resource {} updated", sid))
    }

    pub(super) async fn delete_ha_resource(&self, args: &Value) -> Result<String> {
        let a: SidArgs = args::parse(args)?;
        self.client.delete_ha_resource(&a.sid).await?;
        Ok(format!("HA resource {} removed", a.sid))
    }

    // --- Pools ---

    pub(super) async fn list_pools(&self) -> Result<String> {
        let pools = self.client.get_pools().await?;
        pretty(&pools)
    }

    pub(super) async fn get_pool(&self, args: &Value) -> Result<String> {
        let a: PoolArgs = args::parse(args)?;
        let pool = self.client.get_pool_details(&a.poolid).await?;
        pretty(&pool)
    }

    pub(super) async fn create_pool(&self, args: &Value) -> Result<String> {
        let a: PoolArgs = args::parse(args)?;
        self.client
            .create_pool(&a.poolid, a.comment.as_deref())
            .await?;
        Ok(format!("Pool {} created", a.poolid))
    }

    pub(super) async fn update_pool(&self, args: &Value) -> Result<String> {
        let a: UpdatePoolArgs = args::parse(args)?;
        let update = PoolUpdate {
            comment: a.comment,
            vms: a.vms,
            storage: a.storage,
            delete: a.delete,
        };
        self.client.update_pool(&a.poolid, &update).await?;
        Ok(format!("Pool {} updated", a.poolid))
    }

    pub(super) async fn delete_pool(&self, args: &Value) -> Result<String> {
        let a: PoolArgs = args::parse(args)?;
        self.client.delete_pool(&a.poolid).await?;
        Ok(format!("Pool {} deleted", a.poolid))
    }

    // --- Replication ---

    pub(super) async fn list_replication_jobs(&self) -> Result<String> {
        let jobs = self.client.get_replication_jobs().await?;
        pretty(&jobs)
    }

    pub(super) async fn create_replication_job(&self, args: &Value) -> Result<String> {
        let a: ReplicationArgs = args::parse(args)?;
        let job = ReplicationJob {
            id: a.id,
            target: a.target,
            schedule: a.schedule,
            rate: a.rate,
            comment: a.comment,
            enable: a.enable,
        };
        self.client.create_replication_job(&job).await?;
        Ok(format!("Replication job {} created", job.id))
    }

    pub(super) async fn update_replication_job(&self, args: &Value) -> Result<String> {
        let a: UpdateReplicationArgs = args::parse(args)?;
        let update = ReplicationUpdate {
            schedule: a.schedule,
            rate: a.rate,
            comment: a.comment,
            enable: a.enable,
        };
        self.client.update_replication_job(&a.id, &update).await?;
        Ok(format!("Replication job {} updated", a.id))
    }

    pub(super) async fn delete_replication_job(&self, args: &Value) -> Result<String> {
        let a: IdArgs = args::parse(args)?;
        self.client.delete_replication_job(&a.id).await?;
        Ok(format!("Replication job {} deleted", a.id))
    }
}
