use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use serde_json::Value;

impl ProxmoxClient {
    pub async fn get_pci_devices(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/hardware/pci", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }

    pub async fn get_usb_devices(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/hardware/usb", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }
}
