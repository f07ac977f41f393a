use super::args::{
    self, NodeArgs, ServiceArgs, StatsArgs, SubscriptionKeyArgs, SubscriptionUpdateArgs,
    SyslogArgs,
};
use super::{pretty, McpServer};
use crate::proxmox::{ProxmoxError, Result};
use serde_json::Value;

const SERVICE_ACTIONS: &[&str] = &["start", "stop", "restart", "reload"];

impl McpServer {
    pub(super) async fn list_nodes(&self) -> Result<String> {
        let nodes = self.client.get_nodes().await?;
        pretty(&nodes)
    }

    pub(super) async fn get_node_status(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let status = self.client.get_node_status(&a.node).await?;
        pretty(&status)
    }

    pub(super) async fn list_networks(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let networks = self.client.get_network_interfaces(&a.node).await?;
        pretty(&networks)
    }

    pub(super) async fn get_node_stats(&self, args: &Value) -> Result<String> {
        let a: StatsArgs = args::parse(args)?;
        let stats = self
            .client
            .get_node_stats(&a.node, a.timeframe.as_deref(), a.cf.as_deref())
            .await?;
        pretty(&stats)
    }

    // --- APT ---

    pub(super) async fn list_apt_updates(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let updates = self.client.get_apt_updates(&a.node).await?;
        pretty(&updates)
    }

    pub(super) async fn run_apt_update(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let upid = self.client.run_apt_update(&a.node).await?;
        Ok(format!("APT update initiated. UPID: {}", upid))
    }

    pub(super) async fn get_apt_versions(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let versions = self.client.get_apt_versions(&a.node).await?;
        pretty(&versions)
    }

    // --- Services ---

    pub(super) async fn list_services(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let services = self.client.get_services(&a.node).await?;
        pretty(&services)
    }

    pub(super) async fn manage_service(&self, args: &Value) -> Result<String> {
        let a: ServiceArgs = args::parse(args)?;
        if !SERVICE_ACTIONS.contains(&a.action.as_str()) {
            return Err(ProxmoxError::invalid_params(format!(
                "action must be one of {}, got '{}'",
                SERVICE_ACTIONS.join(", "),
                a.action
            )));
        }
        let upid = self
            .client
            .manage_service(&a.node, &a.service, &a.action)
            .await?;
        Ok(format!(
            "Service {} {} initiated. UPID: {}",
            a.service, a.action, upid
        ))
    }

    pub(super) async fn get_syslog(&self, args: &Value) -> Result<String> {
        let a: SyslogArgs = args::parse(args)?;
        let lines = self
            .client
            .get_syslog(&a.node, a.limit, a.service.as_deref())
            .await?;
        pretty(&lines)
    }

    // --- Hardware ---

    pub(super) async fn list_pci_devices(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let devices = self.client.get_pci_devices(&a.node).await?;
        pretty(&devices)
    }

    pub(super) async fn list_usb_devices(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let devices = self.client.get_usb_devices(&a.node).await?;
        pretty(&devices)
    }

    // --- Subscription ---

    pub(super) async fn get_subscription(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let sub = self.client.get_subscription(&a.node).await?;
        pretty(&sub)
    }

    pub(super) async fn set_subscription(&self, args: &Value) -> Result<String> {
        let a: SubscriptionKeyArgs = args::parse(args)?;
        self.client.set_subscription(&a.node, &a.key).await?;
        Ok(format!("Subscription key set on {}", a.node))
    }

    pub(super) async fn update_subscription(&self, args: &Value) -> Result<String> {
        let a: SubscriptionUpdateArgs = args::parse(args)?;
        self.client
            .update_subscription(&a.node, a.force.unwrap_or(false))
            .await?;
        Ok(format!("Subscription on {} refreshed", a.node))
    }
}
