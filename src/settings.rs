use crate::cli::Args;
use crate::proxmox::client::{Credentials, Secret, DEFAULT_PORT};
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_LOG_FILENAME: &str = "pve-mcp.log";

const REDACTED: &str = "***";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Stdio,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub token_name: Option<String>,
    pub token_value: Option<String>,
    pub no_verify_ssl: Option<bool>,
    pub ticket_ttl_secs: Option<u64>,
    pub server_type: Option<ServerType>,
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub http_auth_token: Option<String>,
    pub log_level: Option<String>,
    pub log_file_enable: Option<bool>,
    pub log_dir: Option<String>,
    pub log_filename: Option<String>,
    pub log_rotate: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Settings {
    /// Loads the config file, then `PROXMOX_*` environment variables on top.
    pub fn new(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut s = Config::builder();

        if let Some(path) = config_path {
            // An explicitly requested file has to exist.
            if !Path::new(path).exists() {
                return Err(ConfigError::NotFound(path.to_string()));
            }
            s = s.add_source(File::with_name(path).required(true));
        } else {
            s = s.add_source(File::with_name("config").required(false));
        }

        s = s.add_source(
            Environment::with_prefix("PROXMOX")
                .prefix_separator("_")
                .try_parsing(true),
        );

        s.build()?.try_deserialize()
    }

    /// CLI flags win over file and environment values.
    pub fn apply_args(&mut self, args: &Args) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        set(&mut self.host, &args.host);
        set(&mut self.port, &args.port);
        set(&mut self.user, &args.user);
        set(&mut self.password, &args.password);
        set(&mut self.token_name, &args.token_name);
        set(&mut self.token_value, &args.token_value);
        set(&mut self.ticket_ttl_secs, &args.ticket_ttl_secs);
        set(&mut self.server_type, &args.server_type);
        set(&mut self.http_host, &args.http_host);
        set(&mut self.http_port, &args.http_port);
        set(&mut self.http_auth_token, &args.http_auth_token);
        set(&mut self.log_level, &args.log_level);
        set(&mut self.log_dir, &args.log_dir);
        set(&mut self.log_filename, &args.log_filename);
        set(&mut self.log_rotate, &args.log_rotate);

        // Boolean flags can only switch a setting on.
        if args.no_verify_ssl {
            self.no_verify_ssl = Some(true);
        }
        if args.log_file_enable {
            self.log_file_enable = Some(true);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if non_empty(&self.host).is_none() {
            bail!("Host is required");
        }
        if non_empty(&self.user).is_none() {
            bail!("User is required");
        }
        match (non_empty(&self.token_name), non_empty(&self.token_value)) {
            (Some(_), Some(_)) => {}
            (Some(_), None) | (None, Some(_)) => {
                bail!("Token name and token value must be given together")
            }
            (None, None) if non_empty(&self.password).is_none() => {
                bail!("Password or API token is required")
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Validated connection credentials. A token takes precedence over a
    /// password when both are present.
    pub fn credentials(&self) -> Result<Credentials> {
        self.validate()?;

        let secret = match (non_empty(&self.token_name), non_empty(&self.token_value)) {
            (Some(name), Some(value)) => Secret::Token {
                name: name.to_string(),
                value: value.to_string(),
            },
            _ => Secret::Password(
                non_empty(&self.password)
                    .context("Password is required")?
                    .to_string(),
            ),
        };

        Ok(Credentials {
            host: non_empty(&self.host).context("Host is required")?.to_string(),
            port: self.port.unwrap_or(DEFAULT_PORT),
            user: non_empty(&self.user).context("User is required")?.to_string(),
            secret,
            verify_tls: !self.no_verify_ssl.unwrap_or(false),
        })
    }

    pub fn server_type(&self) -> ServerType {
        self.server_type.unwrap_or_default()
    }

    pub fn http_addr(&self) -> String {
        format!(
            "{}:{}",
            self.http_host.as_deref().unwrap_or(DEFAULT_HTTP_HOST),
            self.http_port.unwrap_or(DEFAULT_HTTP_PORT)
        )
    }

    /// Copy safe to print: every secret replaced.
    pub fn redacted(&self) -> Settings {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        Settings {
            password: mask(&self.password),
            token_value: mask(&self.token_value),
            http_auth_token: mask(&self.http_auth_token),
            ..self.clone()
        }
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        Ok(match format {
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn base() -> Settings {
        Settings {
            host: Some("1.2.3.4".into()),
            user: Some("root@pam".into()),
            password: Some("pw".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "host = '1.2.3.4'\nuser = 'testuser'\npassword = 'pw'\nno_verify_ssl = true\nserver_type = 'http'\nhttp_port = 8080"
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let settings = Settings::new(Some(path)).unwrap();

        assert_eq!(settings.host, Some("1.2.3.4".to_string()));
        assert_eq!(settings.user, Some("testuser".to_string()));
        assert_eq!(settings.password, Some("pw".to_string()));
        assert_eq!(settings.no_verify_ssl, Some(true));
        assert_eq!(settings.server_type(), ServerType::Http);
        assert_eq!(settings.http_port, Some(8080));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::new(Some("/nonexistent/pve-mcp.toml")).is_err());
    }

    #[test]
    fn test_validation() {
        let s = Settings {
            host: None,
            ..base()
        };
        assert!(s.validate().is_err());

        let s = Settings {
            user: Some("  ".into()),
            ..base()
        };
        assert!(s.validate().is_err());

        let s = Settings {
            password: None,
            ..base()
        };
        assert!(s.validate().is_err());

        let s = Settings {
            password: None,
            token_name: Some("mcp".into()),
            ..base()
        };
        assert!(s.validate().is_err());

        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut s = base();
        let args = Args {
            host: Some("10.0.0.9".into()),
            port: Some(8443),
            no_verify_ssl: true,
            ..Default::default()
        };
        s.apply_args(&args);

        let creds = s.credentials().unwrap();
        assert_eq!(creds.host, "10.0.0.9");
        assert_eq!(creds.port, 8443);
        assert!(!creds.verify_tls);
        assert_eq!(creds.user, "root@pam");
    }

    #[test]
    fn test_credential_defaults() {
        let creds = base().credentials().unwrap();
        assert_eq!(creds.port, 8006);
        assert!(creds.verify_tls);
        assert!(matches!(creds.secret, Secret::Password(ref p) if p == "pw"));
    }

    #[test]
    fn test_token_wins_over_password() {
        let s = Settings {
            token_name: Some("mcp".into()),
            token_value: Some("uuid".into()),
            ..base()
        };
        let creds = s.credentials().unwrap();
        assert!(matches!(creds.secret, Secret::Token { ref name, .. } if name == "mcp"));
    }

    #[test]
    fn test_redacted_render_hides_secrets() {
        let s = Settings {
            http_auth_token: Some("bearer-secret".into()),
            ..base()
        };
        for format in [ConfigFormat::Toml, ConfigFormat::Yaml, ConfigFormat::Json] {
            let out = s.redacted().render(format).unwrap();
            assert!(out.contains("1.2.3.4"));
            assert!(!out.contains("bearer-secret"));
            assert!(!out.contains("\"pw\"") && !out.contains("'pw'") && !out.contains(": pw"));
        }
    }

    #[test]
    fn test_http_addr_defaults() {
        assert_eq!(base().http_addr(), "0.0.0.0:3000");
    }
}
