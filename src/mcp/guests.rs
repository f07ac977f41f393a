use super::args::{
    self, AddDiskArgs, AddNetworkArgs, CloneArgs, CloudInitArgs, ConsoleArgs,
    ContainerResourcesArgs, CreateContainerArgs, CreateVmArgs, DeleteGuestArgs, DeviceArgs,
    GuestArgs, MigrateArgs, ResetArgs, ResizeDiskArgs, SnapshotArgs, StatsArgs, TagArgs,
    UpdateConfigArgs,
};
use super::{pretty, McpServer};
use crate::proxmox::snapshot::SnapshotOptions;
use crate::proxmox::vm::{
    CloneOptions, CloudInitOptions, CreateContainerOptions, CreateVmOptions, DeleteGuestOptions,
    DiskSpec, MigrateOptions, NicSpec,
};
use crate::proxmox::{GuestType, Params, ProxmoxError, Result};
use log::info;
use serde_json::Value;

impl McpServer {
    pub(super) async fn list_vms(&self) -> Result<String> {
        let vms = self.client.get_all_vms().await?;
        pretty(&vms)
    }

    pub(super) async fn list_containers(&self) -> Result<String> {
        let vms = self.client.get_all_vms().await?;
        let containers: Vec<_> = vms
            .into_iter()
            .filter(|vm| vm.vm_type == Some(GuestType::Lxc))
            .collect();
        pretty(&containers)
    }

    pub(super) async fn get_vm_status(&self, args: &Value) -> Result<String> {
        let a: GuestArgs = args::parse(args)?;
        let status = self.client.get_vm_status(&a.node, a.vmid, a.guest).await?;
        pretty(&status)
    }

    pub(super) async fn power_action(
        &self,
        args: &Value,
        action: &str,
        forced: Option<GuestType>,
    ) -> Result<String> {
        let a: GuestArgs = args::parse(args)?;
        let guest = forced.unwrap_or(a.guest);
        let upid = self.client.vm_action(&a.node, a.vmid, action, guest).await?;
        Ok(format!("Action '{}' initiated. UPID: {}", action, upid))
    }

    /// QEMU guests get a hard reset; containers have none and are rebooted.
    pub(super) async fn reset(&self, args: &Value, expected: GuestType) -> Result<String> {
        let a: ResetArgs = args::parse(args)?;

        info!("Resetting {} {}...", expected, a.vmid);

        let (node, guest) = self.client.find_vm_location(a.vmid).await?;
        if guest != expected {
            return Err(ProxmoxError::invalid_params(format!(
                "ID {} is not a {}",
                a.vmid, expected
            )));
        }

        let action = match expected {
            GuestType::Qemu => "reset",
            GuestType::Lxc => "reboot",
        };
        let upid = self.client.vm_action(&node, a.vmid, action, guest).await?;

        info!("Reset initiated for {} {}. UPID: {}", expected, a.vmid, upid);
        Ok(format!("Reset initiated. UPID: {}", upid))
    }

    pub(super) async fn create_vm(&self, args: &Value) -> Result<String> {
        let a: CreateVmArgs = args::parse(args)?;
        let opts = CreateVmOptions {
            vmid: a.vmid,
            name: a.name,
            memory: a.memory,
            cores: a.cores,
            sockets: a.sockets,
            net0: a.net0,
            ide2: a.ide2,
            scsi0: a.scsi0,
            ostype: a.ostype,
            start: a.start,
        };
        let upid = self.client.create_vm(&a.node, &opts).await?;
        Ok(format!("Create qemu initiated. UPID: {}", upid))
    }

    pub(super) async fn create_container(&self, args: &Value) -> Result<String> {
        let a: CreateContainerArgs = args::parse(args)?;
        let opts = CreateContainerOptions {
            vmid: a.vmid,
            ostemplate: a.ostemplate,
            hostname: a.hostname,
            password: a.password,
            memory: a.memory,
            swap: a.swap,
            cores: a.cores,
            rootfs: a.rootfs,
            net0: a.net0,
            ssh_public_keys: a.ssh_public_keys,
            unprivileged: a.unprivileged,
            start: a.start,
        };
        let upid = self.client.create_container(&a.node, &opts).await?;
        Ok(format!("Create lxc initiated. UPID: {}", upid))
    }

    pub(super) async fn delete_guest(&self, args: &Value, guest: GuestType) -> Result<String> {
        let a: DeleteGuestArgs = args::parse(args)?;
        let opts = DeleteGuestOptions {
            purge: a.purge,
            destroy_unreferenced_disks: a.destroy_unreferenced_disks,
        };
        let upid = self
            .client
            .delete_resource(&a.node, a.vmid, guest, &opts)
            .await?;
        Ok(format!("Delete {} initiated. UPID: {}", guest, upid))
    }

    pub(super) async fn get_vm_config(&self, args: &Value) -> Result<String> {
        let a: GuestArgs = args::parse(args)?;
        let config = self.client.get_vm_config(&a.node, a.vmid, a.guest).await?;
        pretty(&config)
    }

    pub(super) async fn update_vm_config(&self, args: &Value) -> Result<String> {
        let a: UpdateConfigArgs = args::parse(args)?;
        let params = Params::from_object(&a.config);
        if params.is_empty() {
            return Err(ProxmoxError::invalid_params("config is empty"));
        }
        self.client
            .update_config(&a.node, a.vmid, a.guest, &params)
            .await?;
        Ok(format!("Configuration of {} {} updated", a.guest, a.vmid))
    }

    pub(super) async fn update_container_resources(&self, args: &Value) -> Result<String> {
        let a: ContainerResourcesArgs = args::parse(args)?;
        let params = Params::new()
            .opt("cores", a.cores)
            .opt("memory", a.memory)
            .opt("swap", a.swap);

        if params.is_empty() && a.disk_size.is_none() {
            return Err(ProxmoxError::invalid_params("no resource changes given"));
        }

        if !params.is_empty() {
            self.client
                .update_config(&a.node, a.vmid, GuestType::Lxc, &params)
                .await?;
        }
        if let Some(size) = &a.disk_size {
            self.client
                .resize_disk(&a.node, a.vmid, GuestType::Lxc, "rootfs", size)
                .await?;
        }
        Ok(format!("Container {} resources updated", a.vmid))
    }

    pub(super) async fn resize_disk(&self, args: &Value) -> Result<String> {
        let a: ResizeDiskArgs = args::parse(args)?;
        self.client
            .resize_disk(&a.node, a.vmid, a.guest, &a.disk, &a.size)
            .await?;
        Ok(format!("Disk {} of {} resized to {}", a.disk, a.vmid, a.size))
    }

    pub(super) async fn add_disk(&self, args: &Value) -> Result<String> {
        let a: AddDiskArgs = args::parse(args)?;
        let disk = DiskSpec {
            device: a.device,
            storage: a.storage,
            size_gb: a.size_gb,
            format: a.format,
            extra_options: a.extra_options,
        };
        self.client
            .add_virtual_disk(&a.node, a.vmid, a.guest, &disk)
            .await?;
        Ok(format!("Disk {} added to {}", disk.device, a.vmid))
    }

    pub(super) async fn remove_disk(&self, args: &Value) -> Result<String> {
        let a: DeviceArgs = args::parse(args)?;
        self.client
            .remove_virtual_disk(&a.node, a.vmid, a.guest, &a.device)
            .await?;
        Ok(format!("Disk {} removed from {}", a.device, a.vmid))
    }

    pub(super) async fn add_network(&self, args: &Value) -> Result<String> {
        let a: AddNetworkArgs = args::parse(args)?;
        let nic = NicSpec {
            device: a.device,
            bridge: a.bridge,
            model: a.model,
            mac: a.mac,
            extra_options: a.extra_options,
        };
        self.client
            .add_network_interface(&a.node, a.vmid, a.guest, &nic)
            .await?;
        Ok(format!("Network interface {} added to {}", nic.device, a.vmid))
    }

    pub(super) async fn remove_network(&self, args: &Value) -> Result<String> {
        let a: DeviceArgs = args::parse(args)?;
        self.client
            .remove_network_interface(&a.node, a.vmid, a.guest, &a.device)
            .await?;
        Ok(format!("Network interface {} removed from {}", a.device, a.vmid))
    }

    pub(super) async fn set_vm_cloudinit(&self, args: &Value) -> Result<String> {
        let a: CloudInitArgs = args::parse(args)?;
        let opts = CloudInitOptions {
            ciuser: a.ciuser,
            cipassword: a.cipassword,
            sshkeys: a.sshkeys,
            ipconfig0: a.ipconfig0,
            nameserver: a.nameserver,
            searchdomain: a.searchdomain,
        };
        self.client
            .set_vm_cloudinit(&a.node, a.vmid, &opts)
            .await?;
        Ok(format!("Cloud-init settings updated for VM {}", a.vmid))
    }

    pub(super) async fn add_tag(&self, args: &Value) -> Result<String> {
        let a: TagArgs = args::parse(args)?;
        let tags = self
            .client
            .add_tag(&a.node, a.vmid, a.guest, &a.tags)
            .await?;
        Ok(format!("Tags of {} are now: {}", a.vmid, tags))
    }

    pub(super) async fn remove_tag(&self, args: &Value) -> Result<String> {
        let a: TagArgs = args::parse(args)?;
        let tags = self
            .client
            .remove_tag(&a.node, a.vmid, a.guest, &a.tags)
            .await?;
        Ok(format!("Tags of {} are now: {}", a.vmid, tags))
    }

    pub(super) async fn set_tags(&self, args: &Value) -> Result<String> {
        let a: TagArgs = args::parse(args)?;
        self.client
            .set_tags(&a.node, a.vmid, a.guest, &a.tags)
            .await?;
        Ok(format!("Tags of {} set to: {}", a.vmid, a.tags))
    }

    pub(super) async fn clone_guest(&self, args: &Value) -> Result<String> {
        let a: CloneArgs = args::parse(args)?;
        let opts = CloneOptions {
            newid: a.newid,
            name: a.name,
            target: a.target,
            full: a.full,
            storage: a.storage,
            description: a.description,
        };
        let upid = self
            .client
            .clone_resource(&a.node, a.vmid, a.guest, &opts)
            .await?;
        Ok(format!(
            "Clone of {} to {} initiated. UPID: {}",
            a.vmid, a.newid, upid
        ))
    }

    pub(super) async fn migrate_guest(&self, args: &Value) -> Result<String> {
        let a: MigrateArgs = args::parse(args)?;
        let opts = MigrateOptions {
            target: a.target,
            online: a.online,
            with_local_disks: a.with_local_disks,
        };
        let upid = self
            .client
            .migrate_resource(&a.node, a.vmid, a.guest, &opts)
            .await?;
        Ok(format!(
            "Migration of {} to {} initiated. UPID: {}",
            a.vmid, opts.target, upid
        ))
    }

    pub(super) fn get_console_url(&self, args: &Value) -> Result<String> {
        let a: ConsoleArgs = args::parse(args)?;
        Ok(self
            .client
            .get_console_url(&a.node, a.vmid, a.guest, a.console.as_deref()))
    }

    pub(super) async fn list_snapshots(&self, args: &Value) -> Result<String> {
        let a: GuestArgs = args::parse(args)?;
        let snapshots = self
            .client
            .get_snapshots(&a.node, a.vmid, a.guest)
            .await?;
        pretty(&snapshots)
    }

    pub(super) async fn create_snapshot(&self, args: &Value) -> Result<String> {
        let a: SnapshotArgs = args::parse(args)?;
        let opts = SnapshotOptions {
            snapname: a.snapname,
            description: a.description,
            vmstate: a.vmstate,
        };
        let upid = self
            .client
            .create_snapshot(&a.node, a.vmid, a.guest, &opts)
            .await?;
        Ok(format!(
            "Snapshot '{}' initiated. UPID: {}",
            opts.snapname, upid
        ))
    }

    pub(super) async fn rollback_snapshot(&self, args: &Value) -> Result<String> {
        let a: SnapshotArgs = args::parse(args)?;
        let upid = self
            .client
            .rollback_snapshot(&a.node, a.vmid, a.guest, &a.snapname)
            .await?;
        Ok(format!(
            "Rollback to '{}' initiated. UPID: {}",
            a.snapname, upid
        ))
    }

    pub(super) async fn delete_snapshot(&self, args: &Value) -> Result<String> {
        let a: SnapshotArgs = args::parse(args)?;
        let upid = self
            .client
            .delete_snapshot(&a.node, a.vmid, a.guest, &a.snapname)
            .await?;
        Ok(format!(
            "Delete snapshot '{}' initiated. UPID: {}",
            a.snapname, upid
        ))
    }

    pub(super) async fn get_vm_stats(&self, args: &Value) -> Result<String> {
        let a: StatsArgs = args::parse(args)?;
        let vmid = a
            .vmid
            .ok_or_else(|| ProxmoxError::invalid_params("missing field `vmid`"))?;
        let stats = self
            .client
            .get_resource_stats(
                &a.node,
                vmid,
                a.guest,
                a.timeframe.as_deref(),
                a.cf.as_deref(),
            )
            .await?;
        pretty(&stats)
    }
}
