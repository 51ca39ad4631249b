use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A repository to keep pushed, as listed in the repository file
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Display name used in log lines
    pub name: String,

    /// Working tree location
    pub path: PathBuf,
}

/// Runtime settings for wipsync, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Repository list file (JSON, or YAML by extension)
    pub repos_file: PathBuf,

    /// Run log location
    pub log_file: PathBuf,

    /// Outbound mail settings
    pub mail: MailConfig,
}

/// SMTP settings used to mail the run log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

// Environment variable names
pub const ENV_REPOS_FILE: &str = "REPOS_FILE";
pub const ENV_LOG_FILE: &str = "LOG_FILE_PATH";
pub const ENV_EMAIL_RECIPIENT: &str = "EMAIL_RECIPIENT";
pub const ENV_EMAIL_HOST: &str = "EMAIL_HOST";
pub const ENV_EMAIL_PORT: &str = "EMAIL_PORT";
pub const ENV_EMAIL_USER: &str = "EMAIL_USER";
pub const ENV_EMAIL_PASS: &str = "EMAIL_PASS";

// Default value functions
fn default_repos_file() -> PathBuf {
    PathBuf::from("./repos.json")
}
fn default_log_file() -> PathBuf {
    PathBuf::from("./info.log")
}
fn default_smtp_port() -> u16 {
    465
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            username: None,
            password: None,
            recipient: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repos_file: default_repos_file(),
            log_file: default_log_file(),
            mail: MailConfig::default(),
        }
    }
}

impl Config {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get(ENV_EMAIL_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid {}: {:?}", ENV_EMAIL_PORT, raw))?,
            None => default_smtp_port(),
        };

        Ok(Self {
            repos_file: get(ENV_REPOS_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(default_repos_file),
            log_file: get(ENV_LOG_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(default_log_file),
            mail: MailConfig {
                host: get(ENV_EMAIL_HOST),
                port,
                username: get(ENV_EMAIL_USER),
                password: get(ENV_EMAIL_PASS),
                recipient: get(ENV_EMAIL_RECIPIENT),
            },
        })
    }

    /// Expand `~` and environment variables in configured paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.repos_file = expand_path(&self.repos_file).context("Failed to expand repos_file path")?;
        self.log_file = expand_path(&self.log_file).context("Failed to expand log_file path")?;
        Ok(())
    }
}

impl MailConfig {
    /// Names of the settings still required before mail can be sent
    pub fn missing_settings(&self) -> Vec<&'static str> {
        [
            (ENV_EMAIL_HOST, self.host.is_none()),
            (ENV_EMAIL_USER, self.username.is_none()),
            (ENV_EMAIL_PASS, self.password.is_none()),
            (ENV_EMAIL_RECIPIENT, self.recipient.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}

/// Load the repository list, in file order
pub fn load_repositories(path: &Path) -> Result<Vec<RepositoryConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repository list: {:?}", path))?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    );

    let mut repos: Vec<RepositoryConfig> = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse repository list: {:?}", path))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse repository list: {:?}", path))?
    };

    for repo in &mut repos {
        repo.path = expand_path(&repo.path)
            .with_context(|| format!("Failed to expand path for repository {}", repo.name))?;
    }

    Ok(repos)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(&path.to_string_lossy())?.into_owned();
    Ok(PathBuf::from(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.repos_file, PathBuf::from("./repos.json"));
        assert_eq!(config.log_file, PathBuf::from("./info.log"));
        assert_eq!(config.mail.port, 465);
        assert!(config.mail.host.is_none());
        assert!(config.mail.recipient.is_none());
    }

    #[test]
    fn test_from_lookup_empty_environment_uses_defaults() {
        let config = Config::from_lookup(|_| None).expect("Failed to build config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_lookup_reads_all_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("REPOS_FILE", "/etc/wipsync/repos.yml"),
            ("LOG_FILE_PATH", "/var/log/wipsync.log"),
            ("EMAIL_RECIPIENT", "me@example.com"),
            ("EMAIL_HOST", "smtp.example.com"),
            ("EMAIL_PORT", "2465"),
            ("EMAIL_USER", "bot@example.com"),
            ("EMAIL_PASS", "hunter2"),
        ]))
        .expect("Failed to build config");

        assert_eq!(config.repos_file, PathBuf::from("/etc/wipsync/repos.yml"));
        assert_eq!(config.log_file, PathBuf::from("/var/log/wipsync.log"));
        assert_eq!(config.mail.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.mail.port, 2465);
        assert_eq!(config.mail.username.as_deref(), Some("bot@example.com"));
        assert_eq!(config.mail.password.as_deref(), Some("hunter2"));
        assert_eq!(config.mail.recipient.as_deref(), Some("me@example.com"));
        assert!(config.mail.missing_settings().is_empty());
    }

    #[test]
    fn test_from_lookup_empty_values_are_unset() {
        let config =
            Config::from_lookup(lookup_from(&[("EMAIL_HOST", "  "), ("EMAIL_PORT", "")]))
                .unwrap();
        assert!(config.mail.host.is_none());
        assert_eq!(config.mail.port, 465);
    }

    #[test]
    fn test_from_lookup_rejects_bad_port() {
        let result = Config::from_lookup(lookup_from(&[("EMAIL_PORT", "smtp")]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("EMAIL_PORT"));
    }

    #[test]
    fn test_missing_mail_settings() {
        let mail = MailConfig {
            host: Some("smtp.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            mail.missing_settings(),
            vec!["EMAIL_USER", "EMAIL_PASS", "EMAIL_RECIPIENT"]
        );
    }

    #[test]
    fn test_load_repositories_json_keeps_order() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("repos.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "notes", "path": "/home/me/notes"},
                {"name": "dotfiles", "path": "/home/me/.dotfiles"}
            ]"#,
        )
        .unwrap();

        let repos = load_repositories(&path).expect("Failed to load repos");

        assert_eq!(
            repos,
            vec![
                RepositoryConfig {
                    name: "notes".to_string(),
                    path: PathBuf::from("/home/me/notes"),
                },
                RepositoryConfig {
                    name: "dotfiles".to_string(),
                    path: PathBuf::from("/home/me/.dotfiles"),
                },
            ]
        );
    }

    #[test]
    fn test_load_repositories_yaml() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("repos.yml");
        std::fs::write(
            &path,
            r#"
- name: notes
  path: /home/me/notes
- name: site
  path: /srv/site
"#,
        )
        .unwrap();

        let repos = load_repositories(&path).expect("Failed to load repos");
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1].name, "site");
        assert_eq!(repos[1].path, PathBuf::from("/srv/site"));
    }

    #[test]
    fn test_load_repositories_expands_tilde() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("repos.json");
        std::fs::write(&path, r#"[{"name": "home", "path": "~/projects/home"}]"#).unwrap();

        let repos = load_repositories(&path).unwrap();
        assert!(!repos[0].path.to_string_lossy().starts_with('~'));
        assert!(repos[0].path.ends_with("projects/home"));
    }

    #[test]
    fn test_load_repositories_malformed() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("repos.json");
        std::fs::write(&path, r#"[{"name": "missing-path"}]"#).unwrap();

        assert!(load_repositories(&path).is_err());
    }

    #[test]
    fn test_load_repositories_nonexistent_file() {
        let result = load_repositories(Path::new("/nonexistent/path/repos.json"));
        assert!(result.is_err());
    }
}
