//! Error types for command execution, repository syncing and mail delivery

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// An external command failed to spawn or exited unsuccessfully
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Command failed: {command}: {message}")]
pub struct CommandError {
    /// The command line that was executed
    pub command: String,
    /// Underlying failure text (stderr, exit status or I/O error)
    pub message: String,
}

impl CommandError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// The mutating step of a sync that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Stage,
    Commit,
    Push,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            SyncStep::Stage => "stage",
            SyncStep::Commit => "commit",
            SyncStep::Push => "push",
        };
        f.write_str(step)
    }
}

/// Why a single repository could not be synced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    /// A status or branch query failed before any decision was made
    #[error("inspection failed: {0}")]
    Inspection(#[source] CommandError),

    /// Stage, commit or push failed after the decision was made
    #[error("{step} failed: {source}")]
    Sync {
        step: SyncStep,
        #[source]
        source: CommandError,
    },
}

/// Failure to deliver the run log by email
#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing mail setting {0}")]
    MissingSetting(&'static str),

    #[error("no log file")]
    NoLogFile,

    #[error("failed to read log file {path}: {source}")]
    ReadLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}
