//! Version-control context.
//!
//! Only two questions are ever asked of git: which branch is checked out, and
//! whether the working tree is clean. Commands run through
//! `std::process::Command` args, never a shell.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// What the core needs from version control.
pub trait VersionControl: Send + Sync {
  /// Name of the checked-out branch, `None` when there is none.
  fn current_branch(&self) -> Option<String>;

  fn is_clean(&self) -> bool;
}

/// Result of a git command execution
#[derive(Debug)]
struct GitOutput {
  success: bool,
  stdout: String,
}

/// Git repository rooted at a working directory.
pub struct GitContext {
  workdir: PathBuf,
}

impl GitContext {
  /// Open the repository containing `workdir`.
  ///
  /// Fails when git is not installed or `workdir` is not inside a work tree.
  pub fn open(workdir: &Path) -> Result<Self> {
    let context = Self {
      workdir: workdir.to_path_buf(),
    };

    let output = context.run(&["rev-parse", "--is-inside-work-tree"])?;
    if !output.success || output.stdout != "true" {
      return Err(Error::Vcs(format!(
        "{} is not inside a git work tree",
        workdir.display()
      )));
    }

    Ok(context)
  }

  fn run(&self, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
      .args(args)
      .current_dir(&self.workdir)
      .output()
      .map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
          Error::Vcs("git not installed or not in PATH".to_string())
        } else {
          Error::Vcs(format!("failed to run git: {}", e))
        }
      })?;

    Ok(GitOutput {
      success: output.status.success(),
      stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
    })
  }
}

impl VersionControl for GitContext {
  fn current_branch(&self) -> Option<String> {
    match self.run(&["rev-parse", "--abbrev-ref", "HEAD"]) {
      // A detached HEAD reports "HEAD"
      Ok(output) if output.success && !output.stdout.is_empty() && output.stdout != "HEAD" => {
        Some(output.stdout)
      }
      Ok(_) => None,
      Err(e) => {
        debug!(error = %e, "could not read current branch");
        None
      }
    }
  }

  fn is_clean(&self) -> bool {
    self
      .run(&["status", "--porcelain"])
      .map(|o| o.success && o.stdout.is_empty())
      .unwrap_or(false)
  }
}

/// Stand-in used outside a repository.
#[derive(Debug, Default)]
pub struct NullVcs;

impl VersionControl for NullVcs {
  fn current_branch(&self) -> Option<String> {
    None
  }

  /// There is no working tree to vouch for.
  fn is_clean(&self) -> bool {
    false
  }
}
