use super::args::{
    self, AddStorageArgs, CreateBackupArgs, DownloadArgs, ListBackupsArgs, NodeArgs,
    RestoreBackupArgs, StorageContentArgs, StorageIdArgs, UpdateStorageArgs, VolumeArgs,
};
use super::{pretty, McpServer};
use crate::proxmox::storage::{
    BackupOptions, DownloadOptions, RestoreOptions, StorageOptions, StorageUpdate,
};
use crate::proxmox::{Params, ProxmoxError, Result, ToParams};
use serde_json::Value;

const DEFAULT_STORAGE: &str = "local";

impl McpServer {
    pub(super) async fn list_storage(&self, args: &Value) -> Result<String> {
        let a: NodeArgs = args::parse(args)?;
        let storage = self.client.get_storage_list(&a.node).await?;
        pretty(&storage)
    }

    pub(super) async fn list_cluster_storage(&self) -> Result<String> {
        let storage = self.client.get_cluster_storage().await?;
        pretty(&storage)
    }

    pub(super) async fn list_storage_content(&self, args: &Value) -> Result<String> {
        let a: StorageContentArgs = args::parse(args)?;
        let storage = a
            .storage
            .ok_or_else(|| ProxmoxError::invalid_params("missing field `storage`"))?;
        let content = self
            .client
            .get_storage_content(&a.node, &storage, a.content.as_deref())
            .await?;
        pretty(&content)
    }

    /// ISO and template listings default to the `local` storage.
    pub(super) async fn list_content_kind(&self, args: &Value, kind: &str) -> Result<String> {
        let a: StorageContentArgs = args::parse(args)?;
        let storage = a.storage.as_deref().unwrap_or(DEFAULT_STORAGE);
        let content = a.content.as_deref().unwrap_or(kind);
        let items = self
            .client
            .get_storage_content(&a.node, storage, Some(content))
            .await?;
        pretty(&items)
    }

    pub(super) async fn add_storage(&self, args: &Value) -> Result<String> {
        let a: AddStorageArgs = args::parse(args)?;
        let extra = Params::new()
            .opt("path", a.path)
            .opt("server", a.server)
            .opt("share", a.share)
            .opt("export", a.export)
            .opt("username", a.username)
            .opt("password", a.password)
            .opt("pool", a.pool)
            .opt("vgname", a.vgname);
        let opts = StorageOptions {
            storage: a.storage,
            storage_type: a.storage_type,
            content: a.content,
            nodes: a.nodes,
            enable: a.enable,
            extra,
        };
        self.client.add_storage(&opts).await?;
        Ok(format!("Storage {} added", opts.storage))
    }

    pub(super) async fn update_storage(&self, args: &Value) -> Result<String> {
        let a: UpdateStorageArgs = args::parse(args)?;
        let update = StorageUpdate {
            content: a.content,
            nodes: a.nodes,
            enable: a.enable,
        };
        if update.to_params().is_empty() {
            return Ok("No changes requested".to_string());
        }
        self.client.update_storage(&a.storage, &update).await?;
        Ok(format!("Storage {} updated", a.storage))
    }

    pub(super) async fn delete_storage(&self, args: &Value) -> Result<String> {
        let a: StorageIdArgs = args::parse(args)?;
        self.client.delete_storage(&a.storage).await?;
        Ok(format!("Storage {} deleted", a.storage))
    }

    pub(super) async fn download_url(&self, args: &Value) -> Result<String> {
        let a: DownloadArgs = args::parse(args)?;
        let opts = DownloadOptions {
            url: a.url,
            filename: a.filename,
            content: a.content,
            checksum: a.checksum,
            checksum_algorithm: a.checksum_algorithm,
            verify_certificates: a.verify_certificates,
        };
        let upid = self
            .client
            .download_url(&a.node, &a.storage, &opts)
            .await?;
        Ok(format!("Download initiated. UPID: {}", upid))
    }

    pub(super) async fn delete_volume(&self, args: &Value) -> Result<String> {
        let a: VolumeArgs = args::parse(args)?;
        self.client
            .delete_volume(&a.node, &a.storage, &a.volid)
            .await?;
        Ok(format!("Volume {} deleted", a.volid))
    }

    pub(super) async fn list_backups(&self, args: &Value) -> Result<String> {
        let a: ListBackupsArgs = args::parse(args)?;
        let backups = self
            .client
            .get_backups(&a.node, &a.storage, a.vmid)
            .await?;
        pretty(&backups)
    }

    pub(super) async fn create_backup(&self, args: &Value) -> Result<String> {
        let a: CreateBackupArgs = args::parse(args)?;
        let opts = BackupOptions {
            vmid: a.vmid,
            storage: a.storage,
            mode: a.mode,
            compress: a.compress,
            remove: a.remove,
            notes_template: a.notes_template,
        };
        let upid = self.client.create_backup(&a.node, &opts).await?;
        Ok(format!("Backup of {} initiated. UPID: {}", a.vmid, upid))
    }

    pub(super) async fn restore_backup(&self, args: &Value) -> Result<String> {
        let a: RestoreBackupArgs = args::parse(args)?;
        let opts = RestoreOptions {
            vmid: a.vmid,
            archive: a.archive,
            storage: a.storage,
            force: a.force,
            unique: a.unique,
        };
        let upid = self
            .client
            .restore_backup(&a.node, a.guest, &opts)
            .await?;
        Ok(format!("Restore of {} initiated. UPID: {}", a.vmid, upid))
    }
}
