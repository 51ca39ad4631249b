/// Common test utilities and helpers for wipsync tests

use async_trait::async_trait;
use lettre::Message;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use wipsync::{CommandError, MailConfig, MailError, MailTransport, RepositoryConfig};

/// A command invocation seen by [`ScriptedRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub dir: PathBuf,
    pub command: String,
}

/// Command runner that answers from a per-repository script and records
/// every call in order
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<(PathBuf, String), VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn ok(self, dir: &Path, command: &str, output: &str) -> Self {
        self.push(dir, command, Ok(output.to_string()))
    }

    /// Queue a failing response
    pub fn fail(self, dir: &Path, command: &str, message: &str) -> Self {
        self.push(dir, command, Err(message.to_string()))
    }

    /// Queue the three inspection queries for a repository on `main`
    pub fn inspection(self, dir: &Path, status: &str, unpushed: &str) -> Self {
        self.ok(dir, "git status --porcelain", status)
            .ok(dir, "git rev-parse --abbrev-ref HEAD", "main")
            .ok(dir, "git log origin/main..main --oneline", unpushed)
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        self.calls.clone()
    }

    fn push(self, dir: &Path, command: &str, response: Result<String, String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((dir.to_path_buf(), command.to_string()))
            .or_default()
            .push_back(response);
        self
    }
}

#[async_trait]
impl wipsync::CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, dir: &Path) -> Result<String, CommandError> {
        self.calls.lock().unwrap().push(Call {
            dir: dir.to_path_buf(),
            command: command.to_string(),
        });

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&(dir.to_path_buf(), command.to_string()))
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(CommandError::new(command, message)),
            None => Err(CommandError::new(command, "unexpected command in test")),
        }
    }
}

/// Mail transport that records messages instead of sending them
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<&'static str>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        if let Some(setting) = self.fail_with {
            return Err(MailError::MissingSetting(setting));
        }
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        self.sent.lock().unwrap().push(raw);
        Ok(())
    }
}

/// Temporary workspace holding the log file
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.temp_dir.path().join("info.log")
    }

    pub fn log_contents(&self) -> String {
        std::fs::read_to_string(self.log_path()).expect("Failed to read log")
    }

    /// Log lines with the header and timestamps stripped
    pub fn log_messages(&self) -> Vec<String> {
        self.log_contents()
            .lines()
            .skip(2)
            .map(|line| match line.find("] ") {
                Some(idx) => line[idx + 2..].to_string(),
                None => line.to_string(),
            })
            .collect()
    }
}

pub fn repo(name: &str) -> RepositoryConfig {
    RepositoryConfig {
        name: name.to_string(),
        path: PathBuf::from(format!("/work/{}", name)),
    }
}

pub fn mail_config() -> MailConfig {
    MailConfig {
        host: Some("smtp.example.com".to_string()),
        port: 465,
        username: Some("bot@example.com".to_string()),
        password: Some("secret".to_string()),
        recipient: Some("me@example.com".to_string()),
    }
}
