//! Runs changed SQL files through a command-line database client, one at a
//! time. A failed file is reported and the run moves on to the next one.

use crate::config::{ConfigError, DeployConfig};
use crate::git::{ChangeSetResolver, GitError, VersionControl, in_repo};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Failed to start `{client}`: {source}")]
    Spawn {
        client: String,
        source: std::io::Error,
    },
    #[error("{} exited with {status}", .path.display())]
    ClientFailed { path: PathBuf, status: ExitStatus },
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Exit code for a run in which at least one file failed, under `fail_on_error`.
pub const EXIT_FILES_FAILED: i32 = 2;

#[cfg_attr(test, mockall::automock)]
pub trait SqlExecutor {
    fn execute_file(&self, config: &DeployConfig, path: &Path) -> Result<(), DeployError>;
}

/// `sqlcmd`-style client: `-S server -U user -P password -d database -b -i file`.
///
/// `-b` makes a SQL error inside the script end the batch with a non-zero
/// exit code; without it only connection failures are visible.
#[derive(Debug, Default)]
pub struct SqlCmd;

impl SqlCmd {
    pub fn command(config: &DeployConfig, path: &Path) -> Command {
        let mut cmd = Command::new(&config.client);
        cmd.arg("-S")
            .arg(&config.server)
            .arg("-U")
            .arg(&config.user)
            .arg("-P")
            .arg(&config.password)
            .arg("-d")
            .arg(&config.database)
            .arg("-b")
            .arg("-i")
            .arg(path);
        cmd
    }
}

impl SqlExecutor for SqlCmd {
    fn execute_file(&self, config: &DeployConfig, path: &Path) -> Result<(), DeployError> {
        debug!(
            client = %config.client,
            server = %config.server,
            database = %config.database,
            path = %path.display(),
            "invoking client"
        );
        let status = Self::command(config, path)
            .status()
            .map_err(|source| DeployError::Spawn {
                client: config.client.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DeployError::ClientFailed {
                path: path.to_path_buf(),
                status,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Deployed,
    Failed(String),
    Skipped,
}

#[derive(Debug, Default)]
pub struct DeploymentReport {
    pub outcomes: Vec<(PathBuf, FileOutcome)>,
}

impl DeploymentReport {
    pub fn deployed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Deployed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct DeploymentRunner<'a, E: SqlExecutor> {
    config: &'a DeployConfig,
    executor: E,
}

impl<'a, E: SqlExecutor> DeploymentRunner<'a, E> {
    pub fn new(config: &'a DeployConfig, executor: E) -> Self {
        Self { config, executor }
    }

    /// Deploys `files` (relative to `root`) in order. Never stops early.
    pub fn run(&self, files: &[PathBuf], root: &Path) -> DeploymentReport {
        let mut report = DeploymentReport::default();

        for file in files {
            let path = in_repo(root, file);
            println!("Deploying {}...", path.display());

            let outcome = match self.executor.execute_file(self.config, &path) {
                Ok(()) => {
                    println!("Successfully deployed {}", file.display());
                    FileOutcome::Deployed
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "deployment failed");
                    println!("Failed to deploy {}: {}", file.display(), e);
                    FileOutcome::Failed(e.to_string())
                }
            };
            report.outcomes.push((file.clone(), outcome));
        }

        info!(
            total = files.len(),
            deployed = report.deployed(),
            failed = report.failed(),
            "deployment finished"
        );
        report
    }
}

/// Lists what a deployment would run. Needs no connection settings.
pub fn list_changes(files: &[PathBuf], root: &Path) -> DeploymentReport {
    let mut report = DeploymentReport::default();
    for file in files {
        println!("Would deploy {}", in_repo(root, file).display());
        report.outcomes.push((file.clone(), FileOutcome::Skipped));
    }
    report
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// List the changed files without loading settings or calling the client.
    pub dry_run: bool,
    /// Report per-file failures through the exit code.
    pub fail_on_error: bool,
}

/// Deploys the SQL files changed between `since` and `HEAD` and returns the
/// process exit code. Settings are loaded only once there is something to run.
pub fn run_deployment<V, E, F>(
    vcs: &V,
    since: &str,
    load_config: F,
    executor: E,
    options: DeployOptions,
) -> Result<i32, RunError>
where
    V: VersionControl,
    E: SqlExecutor,
    F: FnOnce() -> Result<DeployConfig, ConfigError>,
{
    let files = ChangeSetResolver::new(vcs).resolve(since, None)?;
    if files.is_empty() {
        println!("No SQL files changed. Exiting.");
        return Ok(0);
    }
    info!(count = files.len(), since, "changed SQL files found");
    let root = vcs.root()?;

    if options.dry_run {
        let report = list_changes(&files, &root);
        println!("Dry run complete. {} file(s) would be deployed.", report.outcomes.len());
        return Ok(0);
    }

    let config = load_config()?;
    let report = DeploymentRunner::new(&config, executor).run(&files, &root);
    println!(
        "Deployment complete. {} deployed, {} failed.",
        report.deployed(),
        report.failed()
    );

    if options.fail_on_error && report.has_failures() {
        return Ok(EXIT_FILES_FAILED);
    }
    Ok(0)
}
