use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::{ProxmoxError, Result};
use super::params::{BoolEncoding, Params, ToParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// QEMU virtual machine or LXC container.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GuestType {
    #[default]
    Qemu,
    Lxc,
}

impl GuestType {
    pub fn as_str(self) -> &'static str {
        match self {
            GuestType::Qemu => "qemu",
            GuestType::Lxc => "lxc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "qemu" => Some(GuestType::Qemu),
            "lxc" => Some(GuestType::Lxc),
            _ => None,
        }
    }
}

impl fmt::Display for GuestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VmInfo {
    pub vmid: u32,
    pub name: Option<String>,
    pub status: String,
    pub node: Option<String>,
    #[serde(rename = "type")]
    pub vm_type: Option<GuestType>,
}

#[derive(Deserialize, Debug)]
pub struct ClusterResource {
    pub vmid: Option<u32>,
    pub node: Option<String>,
    #[serde(rename = "type")]
    pub res_type: String,
    pub status: Option<String>,
    pub name: Option<String>,
}

/// `POST nodes/{node}/qemu`
#[derive(Debug, Clone, Default)]
pub struct CreateVmOptions {
    pub vmid: u32,
    pub name: Option<String>,
    pub memory: Option<u64>,
    pub cores: Option<u32>,
    pub sockets: Option<u32>,
    pub net0: Option<String>,
    pub ide2: Option<String>,
    pub scsi0: Option<String>,
    pub ostype: Option<String>,
    pub start: Option<bool>,
}

impl ToParams for CreateVmOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("vmid", self.vmid)
            .opt("name", self.name.as_deref())
            .opt("memory", self.memory)
            .opt("cores", self.cores)
            .opt("sockets", self.sockets)
            .opt("net0", self.net0.as_deref())
            .opt("ide2", self.ide2.as_deref())
            .opt("scsi0", self.scsi0.as_deref())
            .opt("ostype", self.ostype.as_deref())
            .flag("start", self.start, BoolEncoding::Numeric)
    }
}

/// `POST nodes/{node}/lxc`
#[derive(Debug, Clone, Default)]
pub struct CreateContainerOptions {
    pub vmid: u32,
    pub ostemplate: String,
    pub hostname: Option<String>,
    pub password: Option<String>,
    pub memory: Option<u64>,
    pub swap: Option<u64>,
    pub cores: Option<u32>,
    pub rootfs: Option<String>,
    pub net0: Option<String>,
    pub ssh_public_keys: Option<String>,
    pub unprivileged: Option<bool>,
    pub start: Option<bool>,
}

impl ToParams for CreateContainerOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("vmid", self.vmid)
            .set("ostemplate", self.ostemplate.as_str())
            .opt("hostname", self.hostname.as_deref())
            .opt("password", self.password.as_deref())
            .opt("memory", self.memory)
            .opt("swap", self.swap)
            .opt("cores", self.cores)
            .opt("rootfs", self.rootfs.as_deref())
            .opt("net0", self.net0.as_deref())
            .opt("ssh-public-keys", self.ssh_public_keys.as_deref())
            .flag("unprivileged", self.unprivileged, BoolEncoding::Numeric)
            .flag("start", self.start, BoolEncoding::Numeric)
    }
}

/// Query flags for `DELETE nodes/{node}/{type}/{vmid}`.
#[derive(Debug, Clone, Default)]
pub struct DeleteGuestOptions {
    pub purge: Option<bool>,
    pub destroy_unreferenced_disks: Option<bool>,
}

impl ToParams for DeleteGuestOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .flag("purge", self.purge, BoolEncoding::Numeric)
            .flag(
                "destroy-unreferenced-disks",
                self.destroy_unreferenced_disks,
                BoolEncoding::Numeric,
            )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub newid: u32,
    pub name: Option<String>,
    pub target: Option<String>,
    pub full: Option<bool>,
    pub storage: Option<String>,
    pub description: Option<String>,
}

impl ToParams for CloneOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("newid", self.newid)
            .opt("name", self.name.as_deref())
            .opt("target", self.target.as_deref())
            .flag("full", self.full, BoolEncoding::Numeric)
            .opt("storage", self.storage.as_deref())
            .opt("description", self.description.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub target: String,
    pub online: Option<bool>,
    pub with_local_disks: Option<bool>,
}

impl ToParams for MigrateOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("target", self.target.as_str())
            .flag("online", self.online, BoolEncoding::Numeric)
            .flag(
                "with-local-disks",
                self.with_local_disks,
                BoolEncoding::Numeric,
            )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloudInitOptions {
    pub ciuser: Option<String>,
    pub cipassword: Option<String>,
    pub sshkeys: Option<String>,
    pub ipconfig0: Option<String>,
    pub nameserver: Option<String>,
    pub searchdomain: Option<String>,
}

impl ToParams for CloudInitOptions {
    fn to_params(&self) -> Params {
        // Proxmox wants sshkeys URL-encoded inside the value itself.
        let sshkeys = self
            .sshkeys
            .as_deref()
            .map(|k| seg(k.trim()).replace('+', "%20"));
        Params::new()
            .opt("ciuser", self.ciuser.as_deref())
            .opt("cipassword", self.cipassword.as_deref())
            .opt("sshkeys", sshkeys)
            .opt("ipconfig0", self.ipconfig0.as_deref())
            .opt("nameserver", self.nameserver.as_deref())
            .opt("searchdomain", self.searchdomain.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct DiskSpec {
    pub device: String,
    pub storage: String,
    pub size_gb: u64,
    pub format: Option<String>,
    pub extra_options: Option<String>,
}

impl DiskSpec {
    fn value(&self) -> String {
        let mut value = format!("{}:{}", self.storage, self.size_gb);
        if let Some(fmt) = &self.format {
            value.push_str(&format!(",format={}", fmt));
        }
        if let Some(opts) = &self.extra_options {
            value.push_str(&format!(",{}", opts));
        }
        value
    }
}

#[derive(Debug, Clone)]
pub struct NicSpec {
    pub device: String,
    pub bridge: String,
    pub model: Option<String>,
    pub mac: Option<String>,
    pub extra_options: Option<String>,
}

impl NicSpec {
    /// QEMU and LXC describe NICs with different key sets.
    fn value(&self, guest: GuestType) -> String {
        let mut value = match guest {
            GuestType::Qemu => {
                let model = self.model.as_deref().unwrap_or("virtio");
                match &self.mac {
                    Some(addr) => format!("{}={},bridge={}", model, addr, self.bridge),
                    None => format!("{},bridge={}", model, self.bridge),
                }
            }
            GuestType::Lxc => {
                let mut v = format!(
                    "name=eth{},bridge={}",
                    self.device.trim_start_matches("net"),
                    self.bridge
                );
                if let Some(addr) = &self.mac {
                    v.push_str(&format!(",hwaddr={}", addr));
                }
                if let Some(m) = self.model.as_deref().filter(|m| *m != "virtio") {
                    v.push_str(&format!(",type={}", m));
                }
                v
            }
        };
        if let Some(opts) = &self.extra_options {
            value.push_str(&format!(",{}", opts));
        }
        value
    }
}

fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(&[',', ';', ' '][..]).filter(|t| !t.is_empty())
}

fn merge_tags(current: &str, add: &str) -> String {
    let mut list: Vec<&str> = split_tags(current).collect();
    for t in split_tags(add) {
        if !list.contains(&t) {
            list.push(t);
        }
    }
    list.join(",")
}

fn strip_tags(current: &str, remove: &str) -> String {
    let remove: Vec<&str> = split_tags(remove).collect();
    split_tags(current)
        .filter(|t| !remove.contains(t))
        .collect::<Vec<_>>()
        .join(",")
}

fn guest_path(node: &str, guest: GuestType, vmid: u32) -> String {
    format!("nodes/{}/{}/{}", seg(node), guest, vmid)
}

impl ProxmoxClient {
    pub async fn get_nodes(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "nodes", None).await
    }

    pub async fn get_node_status(&self, node: &str) -> Result<Value> {
        let path = format!("nodes/{}/status", seg(node));
        self.request_value(ApiMethod::Get, &path, None).await
    }

    pub async fn get_resources(&self, kind: Option<&str>) -> Result<Vec<ClusterResource>> {
        let params = Params::new().opt("type", kind);
        self.request(ApiMethod::Get, "cluster/resources", Some(&params))
            .await
    }

    pub async fn get_all_vms(&self) -> Result<Vec<VmInfo>> {
        let resources = self.get_resources(Some("vm")).await?;
        let vms = resources
            .into_iter()
            .filter_map(|r| {
                let guest = GuestType::parse(&r.res_type)?;
                Some(VmInfo {
                    vmid: r.vmid?,
                    name: r.name,
                    status: r.status.unwrap_or_else(|| "unknown".to_string()),
                    node: r.node,
                    vm_type: Some(guest),
                })
            })
            .collect();
        Ok(vms)
    }

    /// Node and guest type hosting `vmid`, looked up cluster-wide.
    pub async fn find_vm_location(&self, vmid: u32) -> Result<(String, GuestType)> {
        let resources = self.get_resources(Some("vm")).await?;
        resources
            .into_iter()
            .find(|r| r.vmid == Some(vmid))
            .and_then(|r| Some((r.node?, GuestType::parse(&r.res_type)?)))
            .ok_or_else(|| ProxmoxError::NotFound(format!("VMID {}", vmid)))
    }

    pub fn get_console_url(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        console_type: Option<&str>,
    ) -> String {
        let mut url = self.base_url.clone();
        url.set_path("/");

        let console = match guest {
            GuestType::Lxc => "lxc",
            GuestType::Qemu => "kvm",
        };

        url.query_pairs_mut()
            .append_pair("console", console)
            .append_pair(console_type.unwrap_or("novnc"), "1")
            .append_pair("vmid", &vmid.to_string())
            .append_pair("node", node);

        url.to_string()
    }

    pub async fn get_vm_status(&self, node: &str, vmid: u32, guest: GuestType) -> Result<Value> {
        let path = format!("{}/status/current", guest_path(node, guest, vmid));
        self.request_value(ApiMethod::Get, &path, None).await
    }

    /// Power actions (`start`, `stop`, `shutdown`, `reboot`, `reset`,
    /// `suspend`, `resume`). Returns the task UPID.
    pub async fn vm_action(
        &self,
        node: &str,
        vmid: u32,
        action: &str,
        guest: GuestType,
    ) -> Result<String> {
        let path = format!("{}/status/{}", guest_path(node, guest, vmid), action);
        self.request(ApiMethod::Post, &path, None).await
    }

    pub async fn create_vm(&self, node: &str, opts: &CreateVmOptions) -> Result<String> {
        let path = format!("nodes/{}/qemu", seg(node));
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn create_container(
        &self,
        node: &str,
        opts: &CreateContainerOptions,
    ) -> Result<String> {
        let path = format!("nodes/{}/lxc", seg(node));
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn delete_resource(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        opts: &DeleteGuestOptions,
    ) -> Result<String> {
        let path = guest_path(node, guest, vmid);
        self.request(ApiMethod::Delete, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn update_config(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        params: &Params,
    ) -> Result<Value> {
        let path = format!("{}/config", guest_path(node, guest, vmid));
        self.request_value(ApiMethod::Put, &path, Some(params)).await
    }

    pub async fn get_vm_config(&self, node: &str, vmid: u32, guest: GuestType) -> Result<Value> {
        let path = format!("{}/config", guest_path(node, guest, vmid));
        self.request_value(ApiMethod::Get, &path, None).await
    }

    pub async fn resize_disk(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        disk: &str,
        size: &str,
    ) -> Result<Value> {
        let path = format!("{}/resize", guest_path(node, guest, vmid));
        let params = Params::new().set("disk", disk).set("size", size);
        self.request_value(ApiMethod::Put, &path, Some(&params))
            .await
    }

    pub async fn add_virtual_disk(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        disk: &DiskSpec,
    ) -> Result<Value> {
        let params = Params::new().set(&disk.device, disk.value());
        self.update_config(node, vmid, guest, &params).await
    }

    pub async fn remove_virtual_disk(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        device: &str,
    ) -> Result<Value> {
        let params = Params::new().set("delete", device);
        self.update_config(node, vmid, guest, &params).await
    }

    pub async fn add_network_interface(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        nic: &NicSpec,
    ) -> Result<Value> {
        let params = Params::new().set(&nic.device, nic.value(guest));
        self.update_config(node, vmid, guest, &params).await
    }

    pub async fn remove_network_interface(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        device: &str,
    ) -> Result<Value> {
        let params = Params::new().set("delete", device);
        self.update_config(node, vmid, guest, &params).await
    }

    // --- Cloud-Init ---

    pub async fn set_vm_cloudinit(
        &self,
        node: &str,
        vmid: u32,
        opts: &CloudInitOptions,
    ) -> Result<Value> {
        let params = opts.to_params();
        if params.is_empty() {
            return Err(ProxmoxError::invalid_params(
                "no cloud-init settings given",
            ));
        }
        self.update_config(node, vmid, GuestType::Qemu, &params)
            .await
    }

    // --- Tags ---

    async fn current_tags(&self, node: &str, vmid: u32, guest: GuestType) -> Result<String> {
        let config = self.get_vm_config(node, vmid, guest).await?;
        Ok(config
            .get("tags")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string())
    }

    pub async fn add_tag(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        tags: &str,
    ) -> Result<String> {
        let current = self.current_tags(node, vmid, guest).await?;
        let new_tags = merge_tags(&current, tags);
        self.set_tags(node, vmid, guest, &new_tags).await?;
        Ok(new_tags)
    }

    pub async fn remove_tag(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        tags: &str,
    ) -> Result<String> {
        let current = self.current_tags(node, vmid, guest).await?;
        if current.is_empty() {
            return Ok(current);
        }
        let new_tags = strip_tags(&current, tags);
        self.set_tags(node, vmid, guest, &new_tags).await?;
        Ok(new_tags)
    }

    pub async fn set_tags(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        tags: &str,
    ) -> Result<Value> {
        let params = if tags.is_empty() {
            Params::new().set("delete", "tags")
        } else {
            Params::new().set("tags", tags)
        };
        self.update_config(node, vmid, guest, &params).await
    }

    pub async fn clone_resource(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        opts: &CloneOptions,
    ) -> Result<String> {
        let path = format!("{}/clone", guest_path(node, guest, vmid));
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn migrate_resource(
        &self,
        node: &str,
        vmid: u32,
        guest: GuestType,
        opts: &MigrateOptions,
    ) -> Result<String> {
        let path = format!("{}/migrate", guest_path(node, guest, vmid));
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_merge_and_strip() {
        assert_eq!(merge_tags("web;prod", "prod,db"), "web,prod,db");
        assert_eq!(merge_tags("", "a b"), "a,b");
        assert_eq!(strip_tags("web,prod,db", "prod"), "web,db");
    }

    #[test]
    fn test_nic_values() {
        let nic = NicSpec {
            device: "net1".into(),
            bridge: "vmbr0".into(),
            model: None,
            mac: Some("AA:BB:CC:DD:EE:FF".into()),
            extra_options: Some("firewall=1".into()),
        };
        assert_eq!(
            nic.value(GuestType::Qemu),
            "virtio=AA:BB:CC:DD:EE:FF,bridge=vmbr0,firewall=1"
        );
        assert_eq!(
            nic.value(GuestType::Lxc),
            "name=eth1,bridge=vmbr0,hwaddr=AA:BB:CC:DD:EE:FF,firewall=1"
        );
    }

    #[test]
    fn test_disk_value() {
        let disk = DiskSpec {
            device: "scsi1".into(),
            storage: "local-lvm".into(),
            size_gb: 32,
            format: Some("raw".into()),
            extra_options: None,
        };
        assert_eq!(disk.value(), "local-lvm:32,format=raw");
    }

    #[test]
    fn test_clone_params_flag_encoding() {
        let opts = CloneOptions {
            newid: 201,
            full: Some(true),
            ..Default::default()
        };
        assert_eq!(
            opts.to_params().to_json(),
            json!({ "newid": 201, "full": "1" })
        );
    }

    #[test]
    fn test_guest_type_serde() {
        let t: GuestType = serde_json::from_value(json!("lxc")).unwrap();
        assert_eq!(t, GuestType::Lxc);
        assert_eq!(GuestType::parse("node"), None);
    }
}
