use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::Params;
use super::vm::GuestType;
use serde_json::Value;

fn rrd_params(timeframe: Option<&str>, cf: Option<&str>) -> Params {
    Params::new()
        .set("timeframe", timeframe.unwrap_or("hour"))
        .set("cf", cf.unwrap_or("AVERAGE"))
}

impl ProxmoxClient {
    // --- Network ---

    pub async fn get_network_interfaces(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/network", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }

    // --- RRD statistics ---

    pub async fn get_node_stats(
        &self,
        node: &str,
        timeframe: Option<&str>,
        cf: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/rrddata", seg(node));
        self.request(ApiMethod::Get, &path, Some(&rrd_params(timeframe, cf)))
            .await
    }

    pub async fn get_resource_stats(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        timeframe: Option<&str>,
        cf: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/{}/{}/rrddata", seg(node), guest, vmid);
        self.request(ApiMethod::Get, &path, Some(&rrd_params(timeframe, cf)))
            .await
    }

    // --- APT ---

    pub async fn get_apt_updates(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/apt/update", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }

    /// Refreshes the package index; returns the task UPID.
    pub async fn run_apt_update(&self, node: &str) -> Result<String> {
        let path = format!("nodes/{}/apt/update", seg(node));
        self.request(ApiMethod::Post, &path, None).await
    }

    pub async fn get_apt_versions(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/apt/versions", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }

    // --- Services ---

    pub async fn get_services(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/services", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }

    pub async fn manage_service(&self, node: &str, service: &str, action: &str) -> Result<String> {
        let path = format!("nodes/{}/services/{}/{}", seg(node), seg(service), action);
        self.request(ApiMethod::Post, &path, None).await
    }

    // --- Logs ---

    pub async fn get_syslog(
        &self,
        node: &str,
        limit: Option<u64>,
        service: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/syslog", seg(node));
        let params = Params::new().opt("limit", limit).opt("service", service);
        self.request(ApiMethod::Get, &path, Some(&params)).await
    }
}
