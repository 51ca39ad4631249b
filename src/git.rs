use std::sync::Arc;

use crate::command::{quote, CommandRunner};
use crate::config::RepositoryConfig;
use crate::error::{CommandError, RepoError, SyncStep};
use crate::runlog::RunLog;

/// Message used for every automatic commit
pub const COMMIT_MESSAGE: &str = "WIP";

const STATUS_COMMAND: &str = "git status --porcelain";
const BRANCH_COMMAND: &str = "git rev-parse --abbrev-ref HEAD";
const STAGE_COMMAND: &str = "git add .";
const PUSH_COMMAND: &str = "git push";

fn commit_command() -> String {
    format!("git commit -m \"{}\"", COMMIT_MESSAGE)
}

/// Branch names come from git and may hold shell metacharacters
fn unpushed_command(branch: &str) -> Result<String, CommandError> {
    let range = quote(&format!("origin/{branch}..{branch}"))?;
    Ok(format!("git log {} --oneline", range))
}

/// What a repository needs, as seen at inspection time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeStatus {
    pub has_unstaged_changes: bool,
    pub has_unpushed_commits: bool,
    pub branch: String,
}

impl ChangeStatus {
    pub fn is_clean(&self) -> bool {
        !self.has_unstaged_changes && !self.has_unpushed_commits
    }

    /// Push runs whenever anything changed, including a commit made this run
    pub fn needs_push(&self) -> bool {
        self.has_unpushed_commits || self.has_unstaged_changes
    }
}

/// Successful outcome of syncing one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Clean tree, nothing ahead of the remote
    NothingToDo,
    /// Existing local commits were pushed
    Pushed,
    /// Changes were committed as WIP and pushed
    CommittedAndPushed,
}

/// Reads repository state through git's porcelain output
pub struct RepositoryInspector {
    runner: Arc<dyn CommandRunner>,
    log: Arc<RunLog>,
}

impl RepositoryInspector {
    pub fn new(runner: Arc<dyn CommandRunner>, log: Arc<RunLog>) -> Self {
        Self { runner, log }
    }

    /// Determine whether `repo` has uncommitted changes or unpushed commits.
    ///
    /// The first failing query aborts the inspection.
    pub async fn inspect(&self, repo: &RepositoryConfig) -> Result<ChangeStatus, CommandError> {
        self.log
            .log(format!("[{}] Checking for unstaged changes...", repo.name));
        let status = self.runner.run(STATUS_COMMAND, &repo.path).await?;
        let has_unstaged_changes = !status.is_empty();

        self.log.log(format!("[{}] Reading current branch...", repo.name));
        let branch = self.runner.run(BRANCH_COMMAND, &repo.path).await?;

        self.log.log(format!(
            "[{}] Checking for unpushed commits on {}...",
            repo.name, branch
        ));
        let unpushed = self
            .runner
            .run(&unpushed_command(&branch)?, &repo.path)
            .await?;
        let has_unpushed_commits = !unpushed.is_empty();

        Ok(ChangeStatus {
            has_unstaged_changes,
            has_unpushed_commits,
            branch,
        })
    }
}

/// Commits and pushes pending work in a single repository
pub struct RepositorySyncer {
    inspector: RepositoryInspector,
    runner: Arc<dyn CommandRunner>,
    log: Arc<RunLog>,
}

impl RepositorySyncer {
    pub fn new(runner: Arc<dyn CommandRunner>, log: Arc<RunLog>) -> Self {
        Self {
            inspector: RepositoryInspector::new(runner.clone(), log.clone()),
            runner,
            log,
        }
    }

    /// Inspect `repo` and stage, commit and push as needed.
    ///
    /// Failures are written to the run log before being returned.
    pub async fn sync(&self, repo: &RepositoryConfig) -> Result<SyncAction, RepoError> {
        let result = self.try_sync(repo).await;

        match &result {
            Ok(SyncAction::NothingToDo) => {}
            Ok(_) => self
                .log
                .log(format!("[{}] Git commands completed successfully!", repo.name)),
            Err(e) => self.log.log(format!("[{}] Error: {}", repo.name, e)),
        }

        result
    }

    async fn try_sync(&self, repo: &RepositoryConfig) -> Result<SyncAction, RepoError> {
        let status = self
            .inspector
            .inspect(repo)
            .await
            .map_err(RepoError::Inspection)?;

        if status.is_clean() {
            self.log
                .log(format!("[{}] Nothing to stage, commit or push.", repo.name));
            return Ok(SyncAction::NothingToDo);
        }

        if status.has_unstaged_changes {
            self.step(repo, SyncStep::Stage, STAGE_COMMAND).await?;
            self.step(repo, SyncStep::Commit, &commit_command()).await?;
        }

        if status.needs_push() {
            self.step(repo, SyncStep::Push, PUSH_COMMAND).await?;
        }

        if status.has_unstaged_changes {
            Ok(SyncAction::CommittedAndPushed)
        } else {
            Ok(SyncAction::Pushed)
        }
    }

    async fn step(
        &self,
        repo: &RepositoryConfig,
        step: SyncStep,
        command: &str,
    ) -> Result<(), RepoError> {
        self.log.log(format!("[{}] Running {}", repo.name, command));
        self.runner
            .run(command, &repo.path)
            .await
            .map(|_| ())
            .map_err(|source| RepoError::Sync { step, source })
    }
}
