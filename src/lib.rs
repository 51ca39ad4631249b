//! wipsync - Keep a fixed set of local repositories committed and pushed
//!
//! For every configured repository wipsync checks for uncommitted changes and
//! unpushed commits, commits pending work as `WIP`, pushes, and finally mails
//! the run log to a single recipient.
//!
//! ## Modules
//!
//! - [`config`]: Environment settings and the repository list
//! - [`command`]: Shell command execution behind a mockable trait
//! - [`runlog`]: The timestamped run log
//! - [`git`]: Per-repository inspection and sync
//! - [`notify`]: Mail delivery of the run log
//! - [`sync`]: The run loop tying it all together
//! - [`health`]: `doctor` diagnostics

pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod health;
pub mod notify;
pub mod runlog;
pub mod sync;

pub use command::{CommandRunner, ShellRunner};
pub use config::{Config, MailConfig, RepositoryConfig};
pub use error::{CommandError, MailError, RepoError, SyncStep};
pub use git::{ChangeStatus, RepositoryInspector, RepositorySyncer, SyncAction};
pub use health::HealthCheck;
pub use notify::{MailTransport, NotificationSender, SmtpMailer};
pub use runlog::RunLog;
pub use sync::{RepoOutcome, RunSummary, SyncEngine};
