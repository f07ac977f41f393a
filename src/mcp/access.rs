use super::args::{self, AclArgs, CreateUserArgs, RoleArgs, RoleIdArgs, UserIdArgs};
use super::{pretty, McpServer};
use crate::proxmox::access::{AclUpdate, UserOptions};
use crate::proxmox::{ProxmoxError, Result};
use serde_json::Value;

impl McpServer {
    pub(super) async fn list_users(&self) -> Result<String> {
        let users = self.client.get_users().await?;
        pretty(&users)
    }

    pub(super) async fn create_user(&self, args: &Value) -> Result<String> {
        let a: CreateUserArgs = args::parse(args)?;
        let opts = UserOptions {
            userid: a.userid,
            password: a.password,
            email: a.email,
            firstname: a.firstname,
            lastname: a.lastname,
            expire: a.expire,
            enable: a.enable,
            comment: a.comment,
            groups: a.groups,
        };
        self.client.create_user(&opts).await?;
        Ok(format!("User {} created", opts.userid))
    }

    pub(super) async fn delete_user(&self, args: &Value) -> Result<String> {
        let a: UserIdArgs = args::parse(args)?;
        self.client.delete_user(&a.userid).await?;
        Ok(format!("User {} deleted", a.userid))
    }

    pub(super) async fn list_roles(&self) -> Result<String> {
        let roles = self.client.get_roles().await?;
        pretty(&roles)
    }

    pub(super) async fn create_role(&self, args: &Value) -> Result<String> {
        let a: RoleArgs = args::parse(args)?;
        self.client.create_role(&a.roleid, &a.privs).await?;
        Ok(format!("Role {} created", a.roleid))
    }

    pub(super) async fn update_role(&self, args: &Value) -> Result<String> {
        let a: RoleArgs = args::parse(args)?;
        if a.privs.trim().is_empty() {
            return Err(ProxmoxError::invalid_params("privs must not be empty"));
        }
        self.client
            .update_role(&a.roleid, &a.privs, a.append.unwrap_or(false))
            .await?;
        Ok(format!("Role {} updated", a.roleid))
    }

    pub(super) async fn delete_role(&self, args: &Value) -> Result<String> {
        let a: RoleIdArgs = args::parse(args)?;
        self.client.delete_role(&a.roleid).await?;
        Ok(format!("Role {} deleted", a.roleid))
    }

    pub(super) async fn list_acls(&self) -> Result<String> {
        let acls = self.client.get_acls().await?;
        pretty(&acls)
    }

    pub(super) async fn update_acl(&self, args: &Value) -> Result<String> {
        let a: AclArgs = args::parse(args)?;
        let revoke = a.delete.unwrap_or(false);
        let acl = AclUpdate {
            path: a.path,
            roles: a.roles,
            users: a.users,
            groups: a.groups,
            tokens: a.tokens,
            propagate: a.propagate,
            delete: a.delete,
        };
        self.client.update_acl(&acl).await?;
        let verb = if revoke { "revoked from" } else { "granted on" };
        Ok(format!("Roles {} {} {}", acl.roles, verb, acl.path))
    }
}
