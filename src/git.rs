//! Finds the SQL files changed between two git revisions.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::debug;

pub const SQL_EXTENSION: &str = ".sql";

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("`git {args}` exited with {status}: {stderr}")]
    Command {
        args: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("git output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Top-level directory of the working tree.
    fn root(&self) -> Result<PathBuf, GitError>;
    fn head_commit(&self) -> Result<String, GitError>;
    /// Paths differing between `from` and `to`, one per diff entry.
    fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<String>, GitError>;
}

/// The `git` executable, run inside `workdir`.
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        debug!(workdir = %self.workdir.display(), ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()?;

        if !output.status.success() {
            return Err(GitError::Command {
                args: args.join(" "),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

impl VersionControl for GitCli {
    fn root(&self) -> Result<PathBuf, GitError> {
        let out = self.run(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    fn head_commit(&self) -> Result<String, GitError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{}..{}", from, to);
        let out = self.run(&["diff", "--name-only", "-z", &range])?;
        Ok(split_name_list(&out))
    }
}

/// Splits `--name-only -z` output. Paths arrive verbatim, without the
/// C-style quoting git applies to unusual names in line mode.
pub fn split_name_list(out: &str) -> Vec<String> {
    out.split('\0')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct ChangeSetResolver<'a, V: VersionControl> {
    vcs: &'a V,
}

impl<'a, V: VersionControl> ChangeSetResolver<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        Self { vcs }
    }

    /// SQL files changed between `from` and `to`; `to` defaults to `HEAD`.
    /// An empty result means there is nothing to deploy.
    pub fn resolve(&self, from: &str, to: Option<&str>) -> Result<Vec<PathBuf>, GitError> {
        let to = match to {
            Some(rev) => rev.to_string(),
            None => self.vcs.head_commit()?,
        };
        let changed = self.vcs.changed_paths(from, &to)?;
        let sql = filter_sql_paths(&changed);
        debug!(from, to = %to, changed = changed.len(), sql = sql.len(), "resolved change set");
        Ok(sql)
    }
}

/// Keeps non-empty paths ending in `.sql`, case-sensitively, in diff order.
pub fn filter_sql_paths<S: AsRef<str>>(paths: &[S]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty() && p.ends_with(SQL_EXTENSION))
        .map(PathBuf::from)
        .collect()
}

/// Absolute location of a repository-relative change.
pub fn in_repo(root: &Path, changed: &Path) -> PathBuf {
    root.join(changed)
}
