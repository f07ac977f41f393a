use super::client::{seg, ApiMethod, ProxmoxClient};
use super::error::Result;
use super::params::{BoolEncoding, Params, ToParams};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct UserOptions {
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

impl ToParams for UserOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .set("userid", self.userid.as_str())
            .opt("password", self.password.as_deref())
            .opt("email", self.email.as_deref())
            .opt("firstname", self.firstname.as_deref())
            .opt("lastname", self.lastname.as_deref())
            .opt("expire", self.expire)
            .flag("enable", self.enable, BoolEncoding::Numeric)
            .opt("comment", self.comment.as_deref())
            .opt("groups", self.groups.as_ref().map(|g| g.join(",")))
    }
}

/// `PUT access/acl`
#[derive(Debug, Clone, Default)]
pub struct AclUpdate {
    pub path: String,
    pub roles: String,
    pub users: Option<String>,
    pub groups: Option<String>,
    pub tokens: Option<String>,
    pub propagate: Option<bool>,
    pub delete: Option<bool>,
}

impl ToParams for AclUpdate {
    fn to_params(&self) -> Params {
        Params::new()
            .set("path", self.path.as_str())
            .set("roles", self.roles.as_str())
            .opt("users", self.users.as_deref())
            .opt("groups", self.groups.as_deref())
            .opt("tokens", self.tokens.as_deref())
            .flag("propagate", self.propagate, BoolEncoding::Numeric)
            .flag("delete", self.delete, BoolEncoding::Numeric)
    }
}

impl ProxmoxClient {
    pub async fn get_users(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "access/users", None).await
    }

    pub async fn create_user(&self, opts: &UserOptions) -> Result<Value> {
        self.request_value(ApiMethod::Post, "access/users", Some(&opts.to_params()))
            .await
    }

    pub async fn delete_user(&self, userid: &str) -> Result<Value> {
        let path = format!("access/users/{}", seg(userid));
        self.request_value(ApiMethod::Delete, &path, None).await
    }

    // --- Roles & ACL Management ---

    pub async fn get_roles(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "access/roles", None).await
    }

    pub async fn create_role(&self, roleid: &str, privileges: &str) -> Result<Value> {
        let params = Params::new().set("roleid", roleid).set("privs", privileges);
        self.request_value(ApiMethod::Post, "access/roles", Some(&params))
            .await
    }

    pub async fn update_role(&self, roleid: &str, privileges: &str, append: bool) -> Result<Value> {
        let path = format!("access/roles/{}", seg(roleid));
        let params = Params::new()
            .set("privs", privileges)
            .flag("append", append.then_some(true), BoolEncoding::Numeric);
        self.request_value(ApiMethod::Put, &path, Some(&params)).await
    }

    pub async fn delete_role(&self, roleid: &str) -> Result<Value> {
        let path = format!("access/roles/{}", seg(roleid));
        self.request_value(ApiMethod::Delete, &path, None).await
    }

    pub async fn get_acls(&self) -> Result<Vec<Value>> {
        self.request(ApiMethod::Get, "access/acl", None).await
    }

    pub async fn update_acl(&self, acl: &AclUpdate) -> Result<Value> {
        self.request_value(ApiMethod::Put, "access/acl", Some(&acl.to_params()))
            .await
    }
}
