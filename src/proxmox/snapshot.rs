use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params, ToParams};
use super::vm::GuestType;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    pub snapname: String,
    pub description: Option<String>,
    /// Include RAM state; QEMU only.
    pub vmstate: Option<bool>,
}

impl ToParams for SnapshotOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("snapname", self.snapname.as_str())
            .opt("description", self.description.as_deref())
            .flag("vmstate", self.vmstate, BoolEncoding::Numeric)
    }
}

fn snapshot_root(node: &str, guest: GuestType, vmid: u32) -> String {
    format!("nodes/{}/{}/{}/snapshot", seg(node), guest, vmid)
}

impl ProxmoxClient {
    pub async fn get_snapshots(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
    ) -> Result<Vec<Value>> {
        let path = snapshot_root(node, guest, vmid);
        self.request(ApiMethod::Get, &path, None).await
    }

    pub async fn create_snapshot(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        opts: &SnapshotOptions,
    ) -> Result<String> {
        let path = snapshot_root(node, guest, vmid);
        // LXC rejects vmstate outright.
        let mut opts = opts.clone();
        if guest == GuestType::Lxc {
            opts.vmstate = None;
        }
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn rollback_snapshot(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        snapname: &str,
    ) -> Result<String> {
        let path = format!(
            "{}/{}/rollback",
            snapshot_root(node, guest, vmid),
            seg(snapname)
        );
        self.request(ApiMethod::Post, &path, None).await
    }

    pub async fn delete_snapshot(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        snapname: &str,
    ) -> Result<String> {
        let path = format!("{}/{}", snapshot_root(node, guest, vmid), seg(snapname));
        self.request(ApiMethod::Delete, &path, None).await
    }
}
