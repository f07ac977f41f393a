use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params, ToParams};
use serde_json::Value;

/// `PUT pools/{poolid}`: add or remove members.
#[derive(Debug, Clone, Default)]
pub struct PoolUpdate {
    pub comment: Option<String>,
    /// Comma separated vmids.
    pub vms: Option<String>,
    /// Comma separated storage ids.
    pub storage: Option<String>,
    pub delete: Option<bool>,
}

impl ToParams for PoolUpdate {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("comment", self.comment.as_deref())
            .opt("vms", self.vms.as_deref())
            .opt("storage", self.storage.as_deref())
            .flag("delete", self.delete, BoolEncoding::Numeric)
    }
}

impl ProxmoxClient {
    pub async fn get_pools(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "pools", None).await
    }

    pub async fn create_pool(&self, poolid: &str, comment: Option<&str>) -> Result<Value> {
        let params = Params::new().set("poolid", poolid).opt("comment", comment);
        self.request_value(ApiMethod::Post, "pools", Some(&params))
            .await
    }

    pub async fn get_pool_details(&self, poolid: &str) -> Result<Value> {
        let path = format!("pools/{}", seg(poolid));
        self.request_value(ApiMethod::Get, &path, None).await
    }

    pub async fn update_pool(&self, poolid: &str, update: &PoolUpdate) -> Result<Value> {
        let path = format!("pools/{}", seg(poolid));
        self.request_value(ApiMethod::Put, &path, Some(&update.to_params()))
            .await
    }

    pub async fn delete_pool(&self, poolid: &str) -> Result<Value> {
        let path = format!("pools/{}", seg(poolid));
        self.request_value(ApiMethod::Delete, &path, None).await
    }
}
