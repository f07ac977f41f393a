use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params, ToParams};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct ReplicationJob {
    /// `<vmid>-<n>`
    pub id: String,
    pub target: String,
    pub schedule: Option<String>,
    pub rate: Option<f64>,
    pub comment: Option<String>,
    pub enable: Option<bool>,
}

impl ToParams for ReplicationJob {
    fn to_params(&self) -> Params {
        Params::new()
            .set("id", self.id.as_str())
            .set("target", self.target.as_str())
            // ZFS storage replication is the only type Proxmox offers.
            .set("type", "local")
            .opt("schedule", self.schedule.as_deref())
            .opt("rate", self.rate)
            .opt("comment", self.comment.as_deref())
            .flag("disable", self.enable, BoolEncoding::Inverted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplicationUpdate {
    pub schedule: Option<String>,
    pub rate: Option<f64>,
    pub comment: Option<String>,
    pub enable: Option<bool>,
}

impl ToParams for ReplicationUpdate {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("schedule", self.schedule.as_deref())
            .opt("rate", self.rate)
            .opt("comment", self.comment.as_deref())
            .flag("disable", self.enable, BoolEncoding::Inverted)
    }
}

impl ProxmoxClient {
    pub async fn get_replication_jobs(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "cluster/replication", None).await
    }

    pub async fn create_replication_job(&self, job: &ReplicationJob) -> Result<Value> {
        self.request_value(ApiMethod::Post, "cluster/replication", Some(&job.to_params()))
            .await
    }

    pub async fn update_replication_job(&self, id: &str, update: &ReplicationUpdate) -> Result<Value> {
        let path = format!("cluster/replication/{}", seg(id));
        self.request_value(ApiMethod::Put, &path, Some(&update.to_params()))
            .await
    }

    pub async fn delete_replication_job(&self, id: &str) -> Result<Value> {
        let path = format!("cluster/replication/{}", seg(id));
        self.request_value(ApiMethod::Delete, &path, None).await
    }
}
