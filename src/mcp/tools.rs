//! Tool definitions advertised through `tools/list`.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

#[derive(Serialize, Debug, Clone)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Used in error texts: "Error <action>: ...".
    #[serde(skip)]
    pub action: &'static str,
}

fn tool(
    name: &'static str,
    action: &'static str,
    description: &'static str,
    properties: Value,
    required: &[&str],
) -> Tool {
    Tool {
        name,
        description,
        action,
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Merges several property maps into one schema `properties` object.
fn props(parts: &[Value]) -> Value {
    let mut out = Map::new();
    for part in parts {
        if let Value::Object(m) = part {
            out.extend(m.clone());
        }
    }
    Value::Object(out)
}

fn node() -> Value {
    json!({ "node": { "type": "string", "description": "Node name (e.g. pve1)" } })
}

fn guest() -> Value {
    json!({
        "node": { "type": "string", "description": "Node name" },
        "vmid": { "type": "integer", "description": "VM or container ID" },
        "type": { "type": "string", "enum": ["qemu", "lxc"], "description": "Guest type (default: qemu)" }
    })
}

fn vmid_only() -> Value {
    json!({
        "node": { "type": "string", "description": "Node name" },
        "vmid": { "type": "integer", "description": "VM ID" }
    })
}

fn none() -> Value {
    json!({})
}

pub fn definitions() -> &'static [Tool] {
    static TOOLS: OnceLock<Vec<Tool>> = OnceLock::new();
    TOOLS.get_or_init(build)
}

pub fn find(name: &str) -> Option<&'static Tool> {
    definitions().iter().find(|t| t.name == name)
}

fn build() -> Vec<Tool> {
    let mut tools = Vec::new();
    tools.extend(guest_tools());
    tools.extend(storage_tools());
    tools.extend(cluster_tools());
    tools.extend(access_tools());
    tools.extend(agent_tools());
    tools.extend(node_tools());
    tools
}

fn power(name: &'static str, action: &'static str, description: &'static str, lxc: bool) -> Tool {
    let properties = if lxc { vmid_only() } else { guest() };
    tool(name, action, description, properties, &["node", "vmid"])
}

fn guest_tools() -> Vec<Tool> {
    vec![
        tool("list_vms", "listing VMs", "List all VMs and containers across all nodes", none(), &[]),
        tool("list_containers", "listing containers", "List all LXC containers across all nodes", none(), &[]),
        tool(
            "get_vm_status",
            "getting guest status",
            "Get the current status of a VM or container",
            guest(),
            &["node", "vmid"],
        ),
        power("start_vm", "starting VM", "Start a virtual machine", false),
        power("stop_vm", "stopping VM", "Stop a virtual machine immediately", false),
        power("shutdown_vm", "shutting down VM", "Gracefully shut down a virtual machine", false),
        power("reboot_vm", "rebooting VM", "Reboot a virtual machine", false),
        power("suspend_vm", "suspending VM", "Suspend a virtual machine", false),
        power("resume_vm", "resuming VM", "Resume a suspended virtual machine", false),
        power("start_container", "starting container", "Start an LXC container", true),
        power("stop_container", "stopping container", "Stop an LXC container immediately", true),
        power("shutdown_container", "shutting down container", "Gracefully shut down an LXC container", true),
        power("reboot_container", "rebooting container", "Reboot an LXC container", true),
        tool(
            "reset_vm",
            "resetting VM",
            "Hard reset a VM. The node is looked up from the ID.",
            json!({ "vmid": { "type": "integer", "description": "VM ID" } }),
            &["vmid"],
        ),
        tool(
            "reset_container",
            "resetting container",
            "Reboot a container. The node is looked up from the ID.",
            json!({ "vmid": { "type": "integer", "description": "Container ID" } }),
            &["vmid"],
        ),
        tool(
            "create_vm",
            "creating VM",
            "Create a new QEMU virtual machine",
            props(&[
                vmid_only(),
                json!({
                    "name": { "type": "string" },
                    "memory": { "type": "integer", "description": "Memory in MB" },
                    "cores": { "type": "integer" },
                    "sockets": { "type": "integer" },
                    "net0": { "type": "string", "description": "e.g. virtio,bridge=vmbr0" },
                    "ide2": { "type": "string", "description": "e.g. local:iso/debian.iso,media=cdrom" },
                    "scsi0": { "type": "string", "description": "e.g. local-lvm:32" },
                    "ostype": { "type": "string", "description": "e.g. l26" },
                    "start": { "type": "boolean", "description": "Start after creation" }
                }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "create_container",
            "creating container",
            "Create a new LXC container",
            props(&[
                vmid_only(),
                json!({
                    "ostemplate": { "type": "string", "description": "e.g. local:vztmpl/debian-12-standard.tar.zst" },
                    "hostname": { "type": "string" },
                    "password": { "type": "string" },
                    "memory": { "type": "integer", "description": "Memory in MB" },
                    "swap": { "type": "integer", "description": "Swap in MB" },
                    "cores": { "type": "integer" },
                    "rootfs": { "type": "string", "description": "e.g. local-lvm:8" },
                    "net0": { "type": "string", "description": "e.g. name=eth0,bridge=vmbr0,ip=dhcp" },
                    "ssh_public_keys": { "type": "string" },
                    "unprivileged": { "type": "boolean" },
                    "start": { "type": "boolean" }
                }),
            ]),
            &["node", "vmid", "ostemplate"],
        ),
        tool(
            "delete_vm",
            "deleting VM",
            "Delete a virtual machine",
            props(&[
                vmid_only(),
                json!({
                    "purge": { "type": "boolean", "description": "Remove from backup jobs, HA and replication" },
                    "destroy_unreferenced_disks": { "type": "boolean" }
                }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "delete_container",
            "deleting container",
            "Delete an LXC container",
            props(&[
                vmid_only(),
                json!({
                    "purge": { "type": "boolean" },
                    "destroy_unreferenced_disks": { "type": "boolean" }
                }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "get_vm_config",
            "getting guest config",
            "Get the configuration of a VM or container",
            guest(),
            &["node", "vmid"],
        ),
        tool(
            "update_vm_config",
            "updating guest config",
            "Set arbitrary configuration keys on a VM or container",
            props(&[
                guest(),
                json!({ "config": { "type": "object", "description": "Keys and values to set, e.g. {\"onboot\": 1}" } }),
            ]),
            &["node", "vmid", "config"],
        ),
        tool(
            "update_container_resources",
            "updating container resources",
            "Change CPU, memory or root disk size of a container",
            props(&[
                vmid_only(),
                json!({
                    "cores": { "type": "integer" },
                    "memory": { "type": "integer", "description": "Memory in MB" },
                    "swap": { "type": "integer", "description": "Swap in MB" },
                    "disk_size": { "type": "string", "description": "Grow rootfs, e.g. +2G" }
                }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "resize_disk",
            "resizing disk",
            "Resize a guest disk",
            props(&[
                guest(),
                json!({
                    "disk": { "type": "string", "description": "e.g. scsi0 or rootfs" },
                    "size": { "type": "string", "description": "New size (e.g. 50G) or increment (+10G)" }
                }),
            ]),
            &["node", "vmid", "disk", "size"],
        ),
        tool(
            "add_disk",
            "adding disk",
            "Attach a new disk to a guest",
            props(&[
                guest(),
                json!({
                    "device": { "type": "string", "description": "e.g. scsi1 or mp0" },
                    "storage": { "type": "string", "description": "e.g. local-lvm" },
                    "size_gb": { "type": "integer" },
                    "format": { "type": "string", "description": "raw, qcow2, vmdk" },
                    "extra_options": { "type": "string", "description": "Appended as-is, e.g. ssd=1" }
                }),
            ]),
            &["node", "vmid", "device", "storage", "size_gb"],
        ),
        tool(
            "remove_disk",
            "removing disk",
            "Detach a disk from a guest",
            props(&[guest(), json!({ "device": { "type": "string" } })]),
            &["node", "vmid", "device"],
        ),
        tool(
            "add_network",
            "adding network interface",
            "Add a network interface to a guest",
            props(&[
                guest(),
                json!({
                    "device": { "type": "string", "description": "e.g. net1" },
                    "bridge": { "type": "string", "description": "e.g. vmbr0" },
                    "model": { "type": "string", "description": "virtio, e1000, ... (QEMU)" },
                    "mac": { "type": "string" },
                    "extra_options": { "type": "string", "description": "e.g. firewall=1,tag=10" }
                }),
            ]),
            &["node", "vmid", "device", "bridge"],
        ),
        tool(
            "remove_network",
            "removing network interface",
            "Remove a network interface from a guest",
            props(&[guest(), json!({ "device": { "type": "string" } })]),
            &["node", "vmid", "device"],
        ),
        tool(
            "set_vm_cloudinit",
            "setting cloud-init options",
            "Configure cloud-init for a VM",
            props(&[
                vmid_only(),
                json!({
                    "ciuser": { "type": "string" },
                    "cipassword": { "type": "string" },
                    "sshkeys": { "type": "string", "description": "Public keys, one per line" },
                    "ipconfig0": { "type": "string", "description": "e.g. ip=dhcp" },
                    "nameserver": { "type": "string" },
                    "searchdomain": { "type": "string" }
                }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "add_tag",
            "adding tags",
            "Add tags to a guest",
            props(&[guest(), json!({ "tags": { "type": "string", "description": "Comma separated" } })]),
            &["node", "vmid", "tags"],
        ),
        tool(
            "remove_tag",
            "removing tags",
            "Remove tags from a guest",
            props(&[guest(), json!({ "tags": { "type": "string", "description": "Comma separated" } })]),
            &["node", "vmid", "tags"],
        ),
        tool(
            "set_tags",
            "setting tags",
            "Replace all tags of a guest. An empty string clears them.",
            props(&[guest(), json!({ "tags": { "type": "string" } })]),
            &["node", "vmid", "tags"],
        ),
        tool(
            "clone_vm",
            "cloning guest",
            "Clone a VM or container",
            props(&[
                guest(),
                json!({
                    "newid": { "type": "integer" },
                    "name": { "type": "string", "description": "Name (QEMU) or hostname (LXC)" },
                    "target": { "type": "string", "description": "Target node" },
                    "full": { "type": "boolean", "description": "Full clone instead of linked" },
                    "storage": { "type": "string" },
                    "description": { "type": "string" }
                }),
            ]),
            &["node", "vmid", "newid"],
        ),
        tool(
            "migrate_vm",
            "migrating guest",
            "Migrate a VM or container to another node",
            props(&[
                guest(),
                json!({
                    "target": { "type": "string", "description": "Target node" },
                    "online": { "type": "boolean" },
                    "with_local_disks": { "type": "boolean" }
                }),
            ]),
            &["node", "vmid", "target"],
        ),
        tool(
            "get_console_url",
            "building console URL",
            "Build a web console URL for a guest",
            props(&[
                guest(),
                json!({ "console": { "type": "string", "enum": ["novnc", "xtermjs"] } }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "list_snapshots",
            "listing snapshots",
            "List snapshots of a guest",
            guest(),
            &["node", "vmid"],
        ),
        tool(
            "snapshot_vm",
            "creating snapshot",
            "Create a snapshot",
            props(&[
                guest(),
                json!({
                    "snapname": { "type": "string" },
                    "description": { "type": "string" },
                    "vmstate": { "type": "boolean", "description": "Include RAM (QEMU only)" }
                }),
            ]),
            &["node", "vmid", "snapname"],
        ),
        tool(
            "rollback_vm",
            "rolling back snapshot",
            "Roll a guest back to a snapshot",
            props(&[guest(), json!({ "snapname": { "type": "string" } })]),
            &["node", "vmid", "snapname"],
        ),
        tool(
            "delete_snapshot",
            "deleting snapshot",
            "Delete a snapshot",
            props(&[guest(), json!({ "snapname": { "type": "string" } })]),
            &["node", "vmid", "snapname"],
        ),
        tool(
            "get_vm_stats",
            "getting guest statistics",
            "RRD statistics for a guest",
            props(&[
                guest(),
                json!({
                    "timeframe": { "type": "string", "enum": ["hour", "day", "week", "month", "year"] },
                    "cf": { "type": "string", "enum": ["AVERAGE", "MAX"] }
                }),
            ]),
            &["node", "vmid"],
        ),
    ]
}

fn storage_tools() -> Vec<Tool> {
    vec![
        tool("list_storage", "listing storage", "List storage available on a node", node(), &["node"]),
        tool("list_cluster_storage", "listing cluster storage", "List storage definitions of the cluster", none(), &[]),
        tool(
            "list_storage_content",
            "listing storage content",
            "List volumes on a storage",
            props(&[
                node(),
                json!({
                    "storage": { "type": "string" },
                    "content": { "type": "string", "description": "images, rootdir, vztmpl, iso, backup, snippets" }
                }),
            ]),
            &["node", "storage"],
        ),
        tool(
            "list_isos",
            "listing ISO images",
            "List ISO images on a storage",
            props(&[node(), json!({ "storage": { "type": "string", "description": "default: local" } })]),
            &["node"],
        ),
        tool(
            "list_templates",
            "listing templates",
            "List container templates on a storage",
            props(&[
                node(),
                json!({
                    "storage": { "type": "string", "description": "default: local" },
                    "content": { "type": "string", "description": "default: vztmpl" }
                }),
            ]),
            &["node"],
        ),
        tool(
            "add_storage",
            "adding storage",
            "Add a storage definition to the cluster",
            json!({
                "storage": { "type": "string", "description": "Storage ID" },
                "type": { "type": "string", "description": "dir, nfs, cifs, lvm, lvmthin, zfspool, rbd, ..." },
                "content": { "type": "string" },
                "nodes": { "type": "array", "items": { "type": "string" } },
                "enable": { "type": "boolean" },
                "path": { "type": "string" },
                "server": { "type": "string" },
                "share": { "type": "string" },
                "export": { "type": "string" },
                "username": { "type": "string" },
                "password": { "type": "string" },
                "pool": { "type": "string" },
                "vgname": { "type": "string" }
            }),
            &["storage", "type"],
        ),
        tool(
            "update_storage",
            "updating storage",
            "Update a storage definition",
            json!({
                "storage": { "type": "string" },
                "content": { "type": "string" },
                "nodes": { "type": "string", "description": "Comma separated" },
                "enable": { "type": "boolean" }
            }),
            &["storage"],
        ),
        tool(
            "delete_storage",
            "deleting storage",
            "Remove a storage definition",
            json!({ "storage": { "type": "string" } }),
            &["storage"],
        ),
        tool(
            "download_url",
            "downloading to storage",
            "Download a file from a URL onto a storage",
            props(&[
                node(),
                json!({
                    "storage": { "type": "string" },
                    "url": { "type": "string" },
                    "filename": { "type": "string" },
                    "content": { "type": "string", "enum": ["iso", "vztmpl"] },
                    "checksum": { "type": "string" },
                    "checksum_algorithm": { "type": "string", "description": "md5, sha1, sha256, sha512" },
                    "verify_certificates": { "type": "boolean" }
                }),
            ]),
            &["node", "storage", "url", "filename", "content"],
        ),
        tool(
            "delete_volume",
            "deleting volume",
            "Delete a volume from a storage",
            props(&[
                node(),
                json!({
                    "storage": { "type": "string" },
                    "volid": { "type": "string", "description": "e.g. local:iso/debian.iso" }
                }),
            ]),
            &["node", "storage", "volid"],
        ),
        tool(
            "list_backups",
            "listing backups",
            "List backups on a storage",
            props(&[
                node(),
                json!({
                    "storage": { "type": "string" },
                    "vmid": { "type": "integer", "description": "Only backups of this guest" }
                }),
            ]),
            &["node", "storage"],
        ),
        tool(
            "create_backup",
            "creating backup",
            "Back up a guest with vzdump",
            props(&[
                vmid_only(),
                json!({
                    "storage": { "type": "string" },
                    "mode": { "type": "string", "enum": ["snapshot", "suspend", "stop"] },
                    "compress": { "type": "string", "enum": ["0", "gzip", "lzo", "zstd"] },
                    "remove": { "type": "boolean", "description": "Prune older backups" },
                    "notes_template": { "type": "string" }
                }),
            ]),
            &["node", "vmid"],
        ),
        tool(
            "restore_backup",
            "restoring backup",
            "Restore a guest from a backup archive",
            props(&[
                guest(),
                json!({
                    "archive": { "type": "string", "description": "Backup volume id" },
                    "storage": { "type": "string" },
                    "force": { "type": "boolean", "description": "Overwrite an existing guest" },
                    "unique": { "type": "boolean" }
                }),
            ]),
            &["node", "vmid", "archive"],
        ),
    ]
}

fn firewall_scope() -> Value {
    json!({
        "node": { "type": "string", "description": "Node scope; omit for cluster rules" },
        "vmid": { "type": "integer", "description": "Guest scope" }
    })
}

fn cluster_tools() -> Vec<Tool> {
    vec![
        tool("get_cluster_status", "getting cluster status", "Cluster membership and quorum", none(), &[]),
        tool(
            "get_cluster_log",
            "getting cluster log",
            "Recent cluster log entries",
            json!({ "limit": { "type": "integer" } }),
            &[],
        ),
        tool(
            "list_firewall_rules",
            "listing firewall rules",
            "List firewall rules at cluster, node or guest level",
            firewall_scope(),
            &[],
        ),
        tool(
            "add_firewall_rule",
            "adding firewall rule",
            "Add a firewall rule",
            props(&[
                firewall_scope(),
                json!({
                    "type": { "type": "string", "enum": ["in", "out"] },
                    "action": { "type": "string", "enum": ["ACCEPT", "DROP", "REJECT"] },
                    "source": { "type": "string" },
                    "dest": { "type": "string" },
                    "proto": { "type": "string" },
                    "dport": { "type": "string" },
                    "sport": { "type": "string" },
                    "iface": { "type": "string" },
                    "comment": { "type": "string" },
                    "enable": { "type": "boolean" },
                    "pos": { "type": "integer" }
                }),
            ]),
            &["type", "action"],
        ),
        tool(
            "delete_firewall_rule",
            "deleting firewall rule",
            "Delete a firewall rule by position",
            props(&[firewall_scope(), json!({ "pos": { "type": "integer" } })]),
            &["pos"],
        ),
        tool(
            "get_task_status",
            "getting task status",
            "Status of a task by UPID",
            props(&[node(), json!({ "upid": { "type": "string" } })]),
            &["node", "upid"],
        ),
        tool(
            "read_task_log",
            "reading task log",
            "Log output of a task",
            props(&[
                node(),
                json!({ "upid": { "type": "string" }, "limit": { "type": "integer" } }),
            ]),
            &["node", "upid"],
        ),
        tool(
            "list_tasks",
            "listing tasks",
            "Recent tasks on a node",
            props(&[
                node(),
                json!({
                    "limit": { "type": "integer" },
                    "vmid": { "type": "integer" },
                    "errors": { "type": "boolean", "description": "Only failed tasks" }
                }),
            ]),
            &["node"],
        ),
        tool(
            "wait_for_task",
            "waiting for task",
            "Poll a task until it finishes",
            props(&[
                node(),
                json!({
                    "upid": { "type": "string" },
                    "timeout": { "type": "integer", "description": "Seconds (default: 60)" }
                }),
            ]),
            &["node", "upid"],
        ),
        tool("list_ha_resources", "listing HA resources", "List HA managed resources", none(), &[]),
        tool("list_ha_groups", "listing HA groups", "List HA groups", none(), &[]),
        tool(
            "add_ha_resource",
            "adding HA resource",
            "Put a guest under HA management",
            ha_resource(),
            &["sid"],
        ),
        tool(
            "update_ha_resource",
            "updating HA resource",
            "Change HA settings of a resource",
            ha_resource(),
            &["sid"],
        ),
        tool(
            "delete_ha_resource",
            "deleting HA resource",
            "Remove a resource from HA management",
            json!({ "sid": { "type": "string", "description": "e.g. vm:100" } }),
            &["sid"],
        ),
        tool("list_pools", "listing pools", "List resource pools", none(), &[]),
        tool(
            "get_pool",
            "getting pool",
            "Members and details of a pool",
            json!({ "poolid": { "type": "string" } }),
            &["poolid"],
        ),
        tool(
            "create_pool",
            "creating pool",
            "Create a resource pool",
            json!({ "poolid": { "type": "string" }, "comment": { "type": "string" } }),
            &["poolid"],
        ),
        tool(
            "update_pool",
            "updating pool",
            "Add or remove pool members",
            json!({
                "poolid": { "type": "string" },
                "comment": { "type": "string" },
                "vms": { "type": "string", "description": "Comma separated vmids" },
                "storage": { "type": "string", "description": "Comma separated storage ids" },
                "delete": { "type": "boolean", "description": "Remove the listed members instead of adding" }
            }),
            &["poolid"],
        ),
        tool(
            "delete_pool",
            "deleting pool",
            "Delete a resource pool",
            json!({ "poolid": { "type": "string" } }),
            &["poolid"],
        ),
        tool("list_replication_jobs", "listing replication jobs", "List storage replication jobs", none(), &[]),
        tool(
            "create_replication_job",
            "creating replication job",
            "Create a storage replication job",
            json!({
                "id": { "type": "string", "description": "<vmid>-<n>, e.g. 100-0" },
                "target": { "type": "string", "description": "Target node" },
                "schedule": { "type": "string", "description": "e.g. */15" },
                "rate": { "type": "number", "description": "MB/s limit" },
                "comment": { "type": "string" },
                "enable": { "type": "boolean" }
            }),
            &["id", "target"],
        ),
        tool(
            "update_replication_job",
            "updating replication job",
            "Update a storage replication job",
            json!({
                "id": { "type": "string" },
                "schedule": { "type": "string" },
                "rate": { "type": "number" },
                "comment": { "type": "string" },
                "enable": { "type": "boolean" }
            }),
            &["id"],
        ),
        tool(
            "delete_replication_job",
            "deleting replication job",
            "Delete a storage replication job",
            json!({ "id": { "type": "string" } }),
            &["id"],
        ),
    ]
}

fn ha_resource() -> Value {
    json!({
        "sid": { "type": "string", "description": "e.g. vm:100" },
        "state": { "type": "string", "enum": ["started", "stopped", "enabled", "disabled", "ignored"] },
        "group": { "type": "string" },
        "max_restart": { "type": "integer" },
        "max_relocate": { "type": "integer" },
        "comment": { "type": "string" }
    })
}

fn access_tools() -> Vec<Tool> {
    vec![
        tool("list_users", "listing users", "List users", none(), &[]),
        tool(
            "create_user",
            "creating user",
            "Create a user",
            json!({
                "userid": { "type": "string", "description": "e.g. alice@pve" },
                "password": { "type": "string" },
                "email": { "type": "string" },
                "firstname": { "type": "string" },
                "lastname": { "type": "string" },
                "expire": { "type": "integer", "description": "Unix epoch, 0 = never" },
                "enable": { "type": "boolean" },
                "comment": { "type": "string" },
                "groups": { "type": "array", "items": { "type": "string" } }
            }),
            &["userid"],
        ),
        tool(
            "delete_user",
            "deleting user",
            "Delete a user",
            json!({ "userid": { "type": "string" } }),
            &["userid"],
        ),
        tool("list_roles", "listing roles", "List roles and their privileges", none(), &[]),
        tool(
            "create_role",
            "creating role",
            "Create a role",
            json!({
                "roleid": { "type": "string" },
                "privs": { "type": "string", "description": "Comma separated privileges" }
            }),
            &["roleid"],
        ),
        tool(
            "update_role",
            "updating role",
            "Change the privileges of a role",
            json!({
                "roleid": { "type": "string" },
                "privs": { "type": "string" },
                "append": { "type": "boolean", "description": "Add to existing privileges" }
            }),
            &["roleid", "privs"],
        ),
        tool(
            "delete_role",
            "deleting role",
            "Delete a role",
            json!({ "roleid": { "type": "string" } }),
            &["roleid"],
        ),
        tool("list_acls", "listing ACLs", "List access control entries", none(), &[]),
        tool(
            "update_acl",
            "updating ACL",
            "Grant or revoke roles on a path",
            json!({
                "path": { "type": "string", "description": "e.g. /vms/100" },
                "roles": { "type": "string" },
                "users": { "type": "string" },
                "groups": { "type": "string" },
                "tokens": { "type": "string" },
                "propagate": { "type": "boolean" },
                "delete": { "type": "boolean", "description": "Revoke instead of grant" }
            }),
            &["path", "roles"],
        ),
    ]
}

fn agent_tools() -> Vec<Tool> {
    vec![
        tool(
            "vm_agent_ping",
            "pinging guest agent",
            "Check that the QEMU guest agent responds",
            vmid_only(),
            &["node", "vmid"],
        ),
        tool(
            "vm_agent_info",
            "querying guest agent",
            "Read guest information through the agent",
            props(&[
                vmid_only(),
                json!({
                    "command": {
                        "type": "string",
                        "enum": super::agent::INFO_COMMANDS
                    }
                }),
            ]),
            &["node", "vmid", "command"],
        ),
        tool(
            "vm_exec",
            "executing command in guest",
            "Run a command inside a VM through the guest agent",
            props(&[
                vmid_only(),
                json!({
                    "command": {
                        "description": "Command line, or an argv array",
                        "anyOf": [
                            { "type": "string" },
                            { "type": "array", "items": { "type": "string" } }
                        ]
                    },
                    "input_data": { "type": "string", "description": "Passed to stdin" }
                }),
            ]),
            &["node", "vmid", "command"],
        ),
        tool(
            "vm_exec_status",
            "getting exec status",
            "Output and exit code of a command started with vm_exec",
            props(&[vmid_only(), json!({ "pid": { "type": "integer" } })]),
            &["node", "vmid", "pid"],
        ),
        tool(
            "vm_read_file",
            "reading guest file",
            "Read a file inside a VM",
            props(&[vmid_only(), json!({ "file": { "type": "string" } })]),
            &["node", "vmid", "file"],
        ),
        tool(
            "vm_write_file",
            "writing guest file",
            "Write a file inside a VM",
            props(&[
                vmid_only(),
                json!({
                    "file": { "type": "string" },
                    "content": { "type": "string" },
                    "encode": { "type": "boolean", "description": "Base64 encode content (default: false)" }
                }),
            ]),
            &["node", "vmid", "file", "content"],
        ),
    ]
}

fn node_tools() -> Vec<Tool> {
    let node_only = |name: &'static str, action: &'static str, description: &'static str| {
        tool(name, action, description, node(), &["node"])
    };
    vec![
        tool("list_nodes", "listing nodes", "List all nodes in the Proxmox cluster", none(), &[]),
        node_only("get_node_status", "getting node status", "CPU, memory and uptime of a node"),
        node_only("list_networks", "listing networks", "Network interfaces of a node"),
        tool(
            "get_node_stats",
            "getting node statistics",
            "RRD statistics for a node",
            props(&[
                node(),
                json!({
                    "timeframe": { "type": "string", "enum": ["hour", "day", "week", "month", "year"] },
                    "cf": { "type": "string", "enum": ["AVERAGE", "MAX"] }
                }),
            ]),
            &["node"],
        ),
        node_only("list_apt_updates", "listing package updates", "Pending package updates"),
        node_only("run_apt_update", "refreshing package index", "Refresh the package index"),
        node_only("get_apt_versions", "getting package versions", "Installed Proxmox package versions"),
        node_only("list_services", "listing services", "System services of a node"),
        tool(
            "manage_service",
            "managing service",
            "Start, stop, restart or reload a system service",
            props(&[
                node(),
                json!({
                    "service": { "type": "string", "description": "e.g. pveproxy" },
                    "action": { "type": "string", "enum": ["start", "stop", "restart", "reload"] }
                }),
            ]),
            &["node", "service", "action"],
        ),
        tool(
            "get_syslog",
            "reading syslog",
            "Read the node's system log",
            props(&[
                node(),
                json!({
                    "limit": { "type": "integer" },
                    "service": { "type": "string" }
                }),
            ]),
            &["node"],
        ),
        node_only("list_pci_devices", "listing PCI devices", "PCI devices of a node"),
        node_only("list_usb_devices", "listing USB devices", "USB devices of a node"),
        node_only("get_subscription", "getting subscription", "Subscription status of a node"),
        tool(
            "set_subscription",
            "setting subscription key",
            "Upload a subscription key",
            props(&[node(), json!({ "key": { "type": "string" } })]),
            &["node", "key"],
        ),
        tool(
            "update_subscription",
            "refreshing subscription",
            "Re-check the subscription with the server",
            props(&[node(), json!({ "force": { "type": "boolean" } })]),
            &["node"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_are_unique() {
        let mut seen = HashSet::new();
        for t in definitions() {
            assert!(seen.insert(t.name), "duplicate tool {}", t.name);
        }
    }

    #[test]
    fn test_required_fields_are_declared() {
        for t in definitions() {
            let props = t.input_schema["properties"].as_object().unwrap();
            for r in t.input_schema["required"].as_array().unwrap() {
                let r = r.as_str().unwrap();
                assert!(props.contains_key(r), "{} requires undeclared {}", t.name, r);
            }
        }
    }

    #[test]
    fn test_serialized_shape() {
        let v = serde_json::to_value(find("list_nodes").unwrap()).unwrap();
        assert_eq!(v["name"], "list_nodes");
        assert!(v.get("inputSchema").is_some());
        assert!(v.get("action").is_none());
    }
}
