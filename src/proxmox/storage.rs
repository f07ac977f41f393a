use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params, ToParams};
use super::vm::GuestType;
use serde_json::Value;

/// `POST storage`
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    pub storage: String,
    pub storage_type: String,
    pub content: Option<String>,
    pub nodes: Option<Vec<String>>,
    pub enable: Option<bool>,
    /// Backend specific keys (`path`, `server`, `export`, ...).
    pub extra: Params,
}

impl ToParams for StorageOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("storage", self.storage.as_str())
            .set("type", self.storage_type.as_str())
            .opt("content", self.content.as_deref())
            .opt("nodes", self.nodes.as_ref().map(|n| n.join(",")))
            .flag("disable", self.enable, BoolEncoding::Inverted)
            .merge(self.extra.clone())
    }
}

/// `PUT storage/{storage}`
#[derive(Debug, Clone, Default)]
pub struct StorageUpdate {
    pub content: Option<String>,
    pub nodes: Option<String>,
    pub enable: Option<bool>,
}

impl ToParams for StorageUpdate {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("content", self.content.as_deref())
            .opt("nodes", self.nodes.as_deref())
            .flag("disable", self.enable, BoolEncoding::Inverted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub url: String,
    pub filename: String,
    pub content: String,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<String>,
    pub verify_certificates: Option<bool>,
}

impl ToParams for DownloadOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("url", self.url.as_str())
            .set("filename", self.filename.as_str())
            .set("content", self.content.as_str())
            .opt("checksum", self.checksum.as_deref())
            .opt("checksum-algorithm", self.checksum_algorithm.as_deref())
            .flag(
                "verify-certificates",
                self.verify_certificates,
                BoolEncoding::Numeric,
            )
    }
}

/// `POST nodes/{node}/vzdump`
#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    pub vmid: u32,
    pub storage: Option<String>,
    pub mode: Option<String>,
    pub compress: Option<String>,
    pub remove: Option<bool>,
    pub notes_template: Option<String>,
}

impl ToParams for BackupOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("vmid", self.vmid)
            .opt("storage", self.storage.as_deref())
            .opt("mode", self.mode.as_deref())
            .opt("compress", self.compress.as_deref())
            .flag("remove", self.remove, BoolEncoding::Numeric)
            .opt("notes-template", self.notes_template.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub vmid: u32,
    pub archive: String,
    pub storage: Option<String>,
    pub force: Option<bool>,
    pub unique: Option<bool>,
}

impl RestoreOptions {
    /// QEMU restores take `archive`; LXC restores pass the archive as
    /// `ostemplate` with `restore=1`.
    fn params_for(&self, guest: GuestType) -> Params {
        let archive_key = match guest {
            GuestType::Qemu => "archive",
            GuestType::Lxc => "ostemplate",
        };
        let params = Params::new()
            .set("vmid", self.vmid)
            .set(archive_key, self.archive.as_str());
        let params = match guest {
            GuestType::Lxc => params.flag("restore", Some(true), BoolEncoding::Numeric),
            GuestType::Qemu => params,
        };
        params
            .opt("storage", self.storage.as_deref())
            .flag("force", self.force, BoolEncoding::Numeric)
            .flag("unique", self.unique, BoolEncoding::Numeric)
    }
}

fn matches_vmid(entry: &Value, vmid: u32) -> bool {
    if let Some(id) = entry.get("vmid").and_then(|v| v.as_u64()) {
        return id == u64::from(vmid);
    }
    entry
        .get("volid")
        .and_then(|v| v.as_str())
        .map(|volid| volid.contains(&format!("-{}-", vmid)))
        .unwrap_or(false)
}

impl ProxmoxClient {
    pub async fn get_storage_list(&self, node: &str) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/storage", seg(node));
        self.request(ApiMethod::Get, &path, None).await
    }

    pub async fn get_cluster_storage(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "storage", None).await
    }

    pub async fn get_storage_content(
        &self,
        node: &str,
        storage: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = format!("nodes/{}/storage/{}/content", seg(node), seg(storage));
        let params = Params::new().opt("content", content_type);
        self.request(ApiMethod::Get, &path, Some(&params)).await
    }

    pub async fn add_storage(&self, opts: &StorageOptions) -> Result<Value> {
        self.request_value(ApiMethod::Post, "storage", Some(&opts.to_params()))
            .await
    }

    pub async fn update_storage(&self, storage: &str, update: &StorageUpdate) -> Result<Value> {
        let path = format!("storage/{}", seg(storage));
        self.request_value(ApiMethod::Put, &path, Some(&update.to_params()))
            .await
    }

    pub async fn delete_storage(&self, storage: &str) -> Result<Value> {
        let path = format!("storage/{}", seg(storage));
        self.request_value(ApiMethod::Delete, &path, None).await
    }

    pub async fn download_url(
        &self,
        node: &str,
        storage: &str,
        opts: &DownloadOptions,
    ) -> Result<String> {
        let path = format!(
            "nodes/{}/storage/{}/download-url",
            seg(node),
            seg(storage)
        );
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }

    /// Deletes a volume (ISO, template, backup) from storage.
    pub async fn delete_volume(&self, node: &str, storage: &str, volid: &str) -> Result<Value> {
        let path = format!(
            "nodes/{}/storage/{}/content/{}",
            seg(node),
            seg(storage),
            seg(volid)
        );
        self.request_value(ApiMethod::Delete, &path, None).await
    }

    // --- Backups ---

    pub async fn get_backups(
        &self,
        node: &str,
        storage: &str,
        vmid: Option<u32>,
    ) -> Result<Vec<Value>> {
        let backups = self
            .get_storage_content(node, storage, Some("backup"))
            .await?;
        Ok(match vmid {
            Some(id) => backups.into_iter().filter(|b| matches_vmid(b, id)).collect(),
            None => backups,
        })
    }

    pub async fn create_backup(&self, node: &str, opts: &BackupOptions) -> Result<String> {
        let path = format!("nodes/{}/vzdump", seg(node));
        self.request(ApiMethod::Post, &path, Some(&opts.to_params()))
            .await
    }

    pub async fn restore_backup(
        &self,
        node: &str,
        guest: GuestType,
        opts: &RestoreOptions,
    ) -> Result<String> {
        let path = format!("nodes/{}/{}", seg(node), guest);
        self.request(ApiMethod::Post, &path, Some(&opts.params_for(guest)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_enable_maps_to_disable() {
        let opts = StorageOptions {
            storage: "nfs1".into(),
            storage_type: "nfs".into(),
            enable: Some(false),
            extra: Params::new().set("server", "10.0.0.5"),
            ..Default::default()
        };
        assert_eq!(
            opts.to_params().to_json(),
            json!({ "storage": "nfs1", "type": "nfs", "disable": "1", "server": "10.0.0.5" })
        );
    }

    #[test]
    fn test_lxc_restore_uses_ostemplate() {
        let opts = RestoreOptions {
            vmid: 300,
            archive: "local:backup/vzdump-lxc-300.tar.zst".into(),
            ..Default::default()
        };
        let lxc = opts.params_for(GuestType::Lxc).to_json();
        assert_eq!(lxc["ostemplate"], "local:backup/vzdump-lxc-300.tar.zst");
        assert_eq!(lxc["restore"], "1");
        assert!(lxc.get("archive").is_none());

        let qemu = opts.params_for(GuestType::Qemu).to_json();
        assert!(qemu.get("restore").is_none());
        assert!(qemu.get("archive").is_some());
    }

    #[test]
    fn test_backup_vmid_filter() {
        assert!(matches_vmid(&json!({ "vmid": 100 }), 100));
        assert!(matches_vmid(
            &json!({ "volid": "local:backup/vzdump-qemu-100-2024_01_01.vma.zst" }),
            100
        ));
        assert!(!matches_vmid(
            &json!({ "volid": "local:backup/vzdump-qemu-1000-2024_01_01.vma.zst" }),
            100
        ));
    }
}
