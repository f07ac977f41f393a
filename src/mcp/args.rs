//! Tool argument decoding.
//!
//! Clients are loose about numbers: a `vmid` may arrive as `100` or `"100"`.
//! Every tool decodes its arguments into one of the structs here before
//! touching the network, so a bad call never reaches Proxmox.

use crate::proxmox::{GuestType, ProxmoxError, Result};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

pub fn parse<T: DeserializeOwned>(args: &Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(args).map_err(|e| ProxmoxError::invalid_params(e.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Str(String),
}

fn to_vmid<E: de::Error>(raw: NumOrString) -> std::result::Result<u32, E> {
    let n = match raw {
        NumOrString::Num(n) => n,
        NumOrString::Str(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| E::custom(format!("vmid must be numeric, got '{}'", s)))?,
    };
    u32::try_from(n).map_err(|_| E::custom(format!("vmid {} out of range", n)))
}

pub fn vmid<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    to_vmid(NumOrString::deserialize(d)?)
}

pub fn opt_vmid<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
    Option::<NumOrString>::deserialize(d)?
        .map(to_vmid)
        .transpose()
}

/// `exec` takes either an argv array or a whitespace separated string.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum CommandLine {
    Argv(Vec<String>),
    Line(String),
}

impl CommandLine {
    pub fn into_argv(self) -> Vec<String> {
        match self {
            CommandLine::Argv(v) => v,
            CommandLine::Line(s) => s.split_whitespace().map(String::from).collect(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct NodeArgs {
    pub node: String,
}

#[derive(Deserialize, Debug)]
pub struct GuestArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
}

/// QEMU only; no guest type.
#[derive(Deserialize, Debug)]
pub struct VmArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
}

/// Lookup by id alone; node and type are resolved cluster-wide.
#[derive(Deserialize, Debug)]
pub struct ResetArgs {
    #[serde(alias = "vm_id", alias = "container_id", deserialize_with = "vmid")]
    pub vmid: u32,
}

#[derive(Deserialize, Debug)]
pub struct CreateVmArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
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

#[derive(Deserialize, Debug)]
pub struct CreateContainerArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
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

#[derive(Deserialize, Debug)]
pub struct DeleteGuestArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub purge: Option<bool>,
    pub destroy_unreferenced_disks: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateConfigArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub config: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
pub struct ContainerResourcesArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub cores: Option<u32>,
    pub memory: Option<u64>,
    pub swap: Option<u64>,
    /// Grow the root disk, e.g. `+2G`.
    pub disk_size: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ResizeDiskArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub disk: String,
    pub size: String,
}

#[derive(Deserialize, Debug)]
pub struct AddDiskArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub device: String,
    pub storage: String,
    pub size_gb: u64,
    pub format: Option<String>,
    pub extra_options: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DeviceArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub device: String,
}

#[derive(Deserialize, Debug)]
pub struct AddNetworkArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub device: String,
    pub bridge: String,
    pub model: Option<String>,
    pub mac: Option<String>,
    pub extra_options: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CloudInitArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub ciuser: Option<String>,
    pub cipassword: Option<String>,
    pub sshkeys: Option<String>,
    pub ipconfig0: Option<String>,
    pub nameserver: Option<String>,
    pub searchdomain: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TagArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub tags: String,
}

#[derive(Deserialize, Debug)]
pub struct CloneArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    #[serde(deserialize_with = "vmid")]
    pub newid: u32,
    pub name: Option<String>,
    pub target: Option<String>,
    pub full: Option<bool>,
    pub storage: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MigrateArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub target: String,
    pub online: Option<bool>,
    pub with_local_disks: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ConsoleArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    /// `novnc` or `xtermjs`
    pub console: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SnapshotArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub snapname: String,
    pub description: Option<String>,
    pub vmstate: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct StatsArgs {
    pub node: String,
    #[serde(default, deserialize_with = "opt_vmid")]
    pub vmid: Option<u32>,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub timeframe: Option<String>,
    pub cf: Option<String>,
}

// --- Storage ---

#[derive(Deserialize, Debug)]
pub struct StorageContentArgs {
    pub node: String,
    pub storage: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AddStorageArgs {
    pub storage: String,
    #[serde(rename = "type")]
    pub storage_type: String,
    pub content: Option<String>,
    pub nodes: Option<Vec<String>>,
    pub enable: Option<bool>,
    pub path: Option<String>,
    pub server: Option<String>,
    pub share: Option<String>,
    pub export: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool: Option<String>,
    pub vgname: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateStorageArgs {
    pub storage: String,
    pub content: Option<String>,
    pub nodes: Option<String>,
    pub enable: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct StorageIdArgs {
    pub storage: String,
}

#[derive(Deserialize, Debug)]
pub struct DownloadArgs {
    pub node: String,
    pub storage: String,
    pub url: String,
    pub filename: String,
    pub content: String,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<String>,
    pub verify_certificates: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct VolumeArgs {
    pub node: String,
    pub storage: String,
    pub volid: String,
}

#[derive(Deserialize, Debug)]
pub struct ListBackupsArgs {
    pub node: String,
    pub storage: String,
    #[serde(default, deserialize_with = "opt_vmid")]
    pub vmid: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct CreateBackupArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub storage: Option<String>,
    pub mode: Option<String>,
    pub compress: Option<String>,
    pub remove: Option<bool>,
    pub notes_template: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RestoreBackupArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    #[serde(rename = "type", default)]
    pub guest: GuestType,
    pub archive: String,
    pub storage: Option<String>,
    pub force: Option<bool>,
    pub unique: Option<bool>,
}

// --- Cluster ---

#[derive(Deserialize, Debug, Default)]
pub struct LimitArgs {
    pub limit: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct FirewallScopeArgs {
    pub node: Option<String>,
    #[serde(default, deserialize_with = "opt_vmid")]
    pub vmid: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct AddFirewallRuleArgs {
    pub node: Option<String>,
    #[serde(default, deserialize_with = "opt_vmid")]
    pub vmid: Option<u32>,
    /// `in` or `out`
    #[serde(rename = "type")]
    pub direction: String,
    pub action: String,
    pub source: Option<String>,
    pub dest: Option<String>,
    pub proto: Option<String>,
    pub dport: Option<String>,
    pub sport: Option<String>,
    pub iface: Option<String>,
    pub comment: Option<String>,
    pub enable: Option<bool>,
    pub pos: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct DeleteFirewallRuleArgs {
    pub node: Option<String>,
    #[serde(default, deserialize_with = "opt_vmid")]
    pub vmid: Option<u32>,
    pub pos: u32,
}

#[derive(Deserialize, Debug)]
pub struct TaskArgs {
    pub node: String,
    pub upid: String,
    pub limit: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct ListTasksArgs {
    pub node: String,
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "opt_vmid")]
    pub vmid: Option<u32>,
    pub errors: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct WaitTaskArgs {
    pub node: String,
    pub upid: String,
    /// Seconds.
    pub timeout: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct HaResourceArgs {
    /// e.g. `vm:100`
    pub sid: String,
    pub state: Option<String>,
    pub group: Option<String>,
    pub max_restart: Option<u32>,
    pub max_relocate: Option<u32>,
    pub comment: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SidArgs {
    pub sid: String,
}

#[derive(Deserialize, Debug)]
pub struct PoolArgs {
    pub poolid: String,
    pub comment: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdatePoolArgs {
    pub poolid: String,
    pub comment: Option<String>,
    pub vms: Option<String>,
    pub storage: Option<String>,
    pub delete: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ReplicationArgs {
    pub id: String,
    pub target: String,
    pub schedule: Option<String>,
    pub rate: Option<f64>,
    pub comment: Option<String>,
    pub enable: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateReplicationArgs {
    pub id: String,
    pub schedule: Option<String>,
    pub rate: Option<f64>,
    pub comment: Option<String>,
    pub enable: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct IdArgs {
    pub id: String,
}

// --- Access ---

#[derive(Deserialize, Debug)]
pub struct CreateUserArgs {
    pub userid: String,
    pub password: Option<String>,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub expire: Option<i64>,
    pub enable: Option<bool>,
    pub comment: Option<String>,
    pub groups: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
pub struct UserIdArgs {
    pub userid: String,
}

#[derive(Deserialize, Debug)]
pub struct RoleArgs {
    pub roleid: String,
    #[serde(default)]
    pub privs: String,
    pub append: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct RoleIdArgs {
    pub roleid: String,
}

#[derive(Deserialize, Debug)]
pub struct AclArgs {
    pub path: String,
    pub roles: String,
    pub users: Option<String>,
    pub groups: Option<String>,
    pub tokens: Option<String>,
    pub propagate: Option<bool>,
    pub delete: Option<bool>,
}

// --- Agent ---

#[derive(Deserialize, Debug)]
pub struct AgentInfoArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub command: String,
}

#[derive(Deserialize, Debug)]
pub struct ExecArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub command: CommandLine,
    pub input_data: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ExecStatusArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub pid: i64,
}

#[derive(Deserialize, Debug)]
pub struct FileReadArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub file: String,
}

#[derive(Deserialize, Debug)]
pub struct FileWriteArgs {
    pub node: String,
    #[serde(deserialize_with = "vmid")]
    pub vmid: u32,
    pub file: String,
    pub content: String,
    pub encode: Option<bool>,
}

// --- Node ---

#[derive(Deserialize, Debug)]
pub struct ServiceArgs {
    pub node: String,
    pub service: String,
    pub action: String,
}

#[derive(Deserialize, Debug)]
pub struct SyslogArgs {
    pub node: String,
    pub limit: Option<u64>,
    pub service: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SubscriptionKeyArgs {
    pub node: String,
    pub key: String,
}

#[derive(Deserialize, Debug)]
pub struct SubscriptionUpdateArgs {
    pub node: String,
    pub force: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vmid_accepts_number_or_string() {
        let a: GuestArgs = parse(&json!({ "node": "pve1", "vmid": 100 })).unwrap();
        assert_eq!(a.vmid, 100);
        assert_eq!(a.guest, GuestType::Qemu);

        let a: GuestArgs = parse(&json!({ "node": "pve1", "vmid": "101", "type": "lxc" })).unwrap();
        assert_eq!(a.vmid, 101);
        assert_eq!(a.guest, GuestType::Lxc);
    }

    #[test]
    fn test_bad_arguments_are_invalid_params() {
        let err = parse::<GuestArgs>(&json!({ "node": "pve1", "vmid": "abc" })).unwrap_err();
        assert!(matches!(err, ProxmoxError::InvalidParams(_)));

        let err = parse::<GuestArgs>(&json!({ "vmid": 100 })).unwrap_err();
        assert!(err.to_string().contains("node"));

        let err = parse::<GuestArgs>(&json!({ "node": "n", "vmid": 1, "type": "docker" })).unwrap_err();
        assert!(matches!(err, ProxmoxError::InvalidParams(_)));
    }

    #[test]
    fn test_optional_vmid() {
        let a: ListBackupsArgs = parse(&json!({ "node": "n", "storage": "local" })).unwrap();
        assert_eq!(a.vmid, None);
        let a: ListBackupsArgs =
            parse(&json!({ "node": "n", "storage": "local", "vmid": "105" })).unwrap();
        assert_eq!(a.vmid, Some(105));
    }

    #[test]
    fn test_reset_accepts_legacy_keys() {
        let a: ResetArgs = parse(&json!({ "vm_id": "100" })).unwrap();
        assert_eq!(a.vmid, 100);
        let a: ResetArgs = parse(&json!({ "container_id": 200 })).unwrap();
        assert_eq!(a.vmid, 200);
    }

    #[test]
    fn test_null_arguments_decode_as_empty() {
        let a: LimitArgs = parse(&Value::Null).unwrap();
        assert_eq!(a.limit, None);
    }

    #[test]
    fn test_command_line_forms() {
        let a: ExecArgs = parse(&json!({ "node": "n", "vmid": 1, "command": "ls -l /tmp" })).unwrap();
        assert_eq!(a.command.into_argv(), vec!["ls", "-l", "/tmp"]);

        let a: ExecArgs =
            parse(&json!({ "node": "n", "vmid": 1, "command": ["sh", "-c", "echo hi"] })).unwrap();
        assert_eq!(a.command.into_argv(), vec!["sh", "-c", "echo hi"]);
    }
}
