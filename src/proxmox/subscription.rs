use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params};
use serde_json::Value;

impl ProxmoxClient {
    pub async fn get_subscription(&self, node: &str) -> Result<Value> {
        let path = format!("nodes/{}/subscription", seg(node));
        self.request_value(ApiMethod::Get, &path, None).await
    }

    pub async fn set_subscription(&self, node: &str, key: &str) -> Result<Value> {
        let path = format!("nodes/{}/subscription", seg(node));
        let params = Params::new().set("key", key);
        self.request_value(ApiMethod::Put, &path, Some(&params))
            .await
    }

    /// Asks the node to re-check its subscription with the shop server.
    pub async fn update_subscription(&self, node: &str, force: bool) -> Result<Value> {
        let path = format!("nodes/{}/subscription", seg(node));
        let params = Params::new().flag("force", force.then_some(true), BoolEncoding::Numeric);
        self.request_value(ApiMethod::Post, &path, Some(&params))
            .await
    }
}
