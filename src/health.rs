//! System health checks for wipsync
//!
//! This module provides the `doctor` diagnostics: everything a run depends on
//! that can be verified without touching a repository.

use std::path::Path;

use crate::config::{load_repositories, Config};

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Git installation status
    pub git: CheckResult,
    /// Repository list status
    pub repositories: CheckResult,
    /// Log file location status
    pub log_file: CheckResult,
    /// Mail settings status (warning only, the run still completes)
    pub mail: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::ok(message)
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::error(message)
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub fn run(config: &Config) -> Self {
        Self {
            git: Self::check_git(),
            repositories: Self::check_repositories(&config.repos_file),
            log_file: Self::check_log_file(&config.log_file),
            mail: Self::check_mail(config),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.git.passed && self.repositories.passed && self.log_file.passed
        // Mail is optional, a run without it still commits and pushes
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        [&self.git, &self.repositories, &self.log_file, &self.mail]
            .into_iter()
            .filter(|r| r.is_warning)
            .collect()
    }

    /// Check git installation
    fn check_git() -> CheckResult {
        match std::process::Command::new("git").arg("--version").output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                CheckResult::ok_with_details("Git installed", version.trim().to_string())
            }
            Ok(_) => CheckResult::error("Git command failed"),
            Err(_) => CheckResult::error_with_details(
                "Git not found in PATH",
                "Install git: https://git-scm.com/downloads",
            ),
        }
    }

    /// Check the repository list parses and every entry is a work tree
    fn check_repositories(repos_file: &Path) -> CheckResult {
        let repos = match load_repositories(repos_file) {
            Ok(repos) => repos,
            Err(e) => {
                return CheckResult::error_with_details(
                    "Repository list unreadable",
                    format!("{:#}", e),
                )
            }
        };

        if repos.is_empty() {
            return CheckResult::warning_with_details(
                "Repository list is empty",
                format!("Add entries to {}", repos_file.display()),
            );
        }

        let broken: Vec<String> = repos
            .iter()
            .filter(|repo| !repo.path.join(".git").exists())
            .map(|repo| format!("{} ({})", repo.name, repo.path.display()))
            .collect();

        if broken.is_empty() {
            CheckResult::ok_with_details(
                format!("{} repositories configured", repos.len()),
                repos_file.display().to_string(),
            )
        } else {
            CheckResult::error_with_details(
                "Some entries are not git repositories",
                broken.join("\n"),
            )
        }
    }

    /// Check the log file's directory is writable, or can be created.
    ///
    /// A run creates missing parent directories, so a missing directory only
    /// matters when its nearest existing ancestor cannot hold it.
    fn check_log_file(log_file: &Path) -> CheckResult {
        let dir = match log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir,
            None => Path::new("."),
        };

        let Some((existing, meta)) = dir
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .chain(dir.is_relative().then_some(Path::new(".")))
            .find_map(|p| std::fs::metadata(p).ok().map(|meta| (p, meta)))
        else {
            return CheckResult::error_with_details(
                "Log directory does not exist",
                dir.display().to_string(),
            );
        };

        if !meta.is_dir() {
            return CheckResult::error_with_details(
                "Log location is not a directory",
                existing.display().to_string(),
            );
        }
        if meta.permissions().readonly() {
            return CheckResult::error_with_details(
                "Log directory is read-only",
                existing.display().to_string(),
            );
        }

        if existing == dir {
            CheckResult::ok_with_details("Log directory writable", log_file.display().to_string())
        } else {
            CheckResult::ok_with_details(
                "Log directory will be created on the first run",
                log_file.display().to_string(),
            )
        }
    }

    /// Check mail settings (warning only)
    fn check_mail(config: &Config) -> CheckResult {
        let missing = config.mail.missing_settings();
        if missing.is_empty() {
            CheckResult::ok_with_details(
                "Mail settings present",
                format!(
                    "{}:{}",
                    config.mail.host.as_deref().unwrap_or_default(),
                    config.mail.port
                ),
            )
        } else {
            CheckResult::warning_with_details(
                "Mail settings incomplete, the run log will not be mailed",
                format!("Missing: {}", missing.join(", ")),
            )
        }
    }

    /// Get all checks as a slice for iteration
    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 4] {
        [
            ("Git Installation", &self.git),
            ("Repository List", &self.repositories),
            ("Log File", &self.log_file),
            ("Mail Settings", &self.mail),
        ]
    }
}
