//! Sync Engine - Runs every configured repository, then mails the log
//!
//! Repositories are processed strictly one after another in list order. A
//! failing repository is recorded in the [`RunSummary`] and the loop moves on;
//! the mail attempt happens once, after the last repository.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::command::CommandRunner;
use crate::config::RepositoryConfig;
use crate::error::RepoError;
use crate::git::{RepositorySyncer, SyncAction};
use crate::notify::NotificationSender;
use crate::runlog::RunLog;

/// Outcome for one repository of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    pub name: String,
    pub path: PathBuf,
    pub result: Result<SyncAction, RepoError>,
}

/// Results from a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<RepoOutcome>,
    pub mail_sent: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn total_repositories(&self) -> usize {
        self.outcomes.len()
    }

    pub fn synced(&self) -> usize {
        self.count(|r| matches!(r, Ok(SyncAction::Pushed | SyncAction::CommittedAndPushed)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|r| matches!(r, Ok(SyncAction::NothingToDo)))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&RepoOutcome, &RepoError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|e| (outcome, e)))
    }

    fn count(&self, pred: impl Fn(&Result<SyncAction, RepoError>) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }
}

/// The engine that drives a full run
pub struct SyncEngine {
    syncer: RepositorySyncer,
    notifier: NotificationSender,
    log: Arc<RunLog>,
}

impl SyncEngine {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        notifier: NotificationSender,
        log: Arc<RunLog>,
    ) -> Self {
        Self {
            syncer: RepositorySyncer::new(runner, log.clone()),
            notifier,
            log,
        }
    }

    /// Sync every repository in order, then mail the run log
    pub async fn run(&self, repos: &[RepositoryConfig]) -> RunSummary {
        let start_time = Instant::now();
        info!("Processing {} repositories", repos.len());

        let mut outcomes = Vec::with_capacity(repos.len());

        for repo in repos {
            self.log
                .log(format!("*** Processing repository: {} ***", repo.name));

            let result = self.syncer.sync(repo).await;
            debug!("{}: {:?}", repo.name, result);

            outcomes.push(RepoOutcome {
                name: repo.name.clone(),
                path: repo.path.clone(),
                result,
            });
        }

        let mail_sent = self.notifier.send_log(self.log.path()).await.is_ok();

        let summary = RunSummary {
            outcomes,
            mail_sent,
            duration: start_time.elapsed(),
        };

        info!(
            "Run completed in {:.2}s: {} synced, {} unchanged, {} failed",
            summary.duration.as_secs_f64(),
            summary.synced(),
            summary.unchanged(),
            summary.failed()
        );

        summary
    }
}
