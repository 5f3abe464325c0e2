use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jt")]
#[command(about = "A cached command-line companion for a Jira sprint board")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jt/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Log debug output to stderr
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Issue to show, e.g. `1234` or `PE-1234`. Without one, shows your board.
  pub issue: Option<String>,

  #[command(subcommand)]
  pub command: Option<Command>,
}

impl Args {
  /// Parse the process arguments, exiting with a usage error on bad input.
  pub fn parse_checked() -> Self {
    let args = Self::parse();
    if let Err(e) = args.check() {
      e.exit();
    }
    args
  }

  /// An issue reference and a subcommand cannot be combined.
  pub fn check(&self) -> Result<(), clap::Error> {
    match (&self.issue, &self.command) {
      (Some(issue), Some(_)) => Err(Self::command().error(
        ErrorKind::ArgumentConflict,
        format!("issue `{}` cannot be combined with a subcommand", issue),
      )),
      _ => Ok(()),
    }
  }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Issues assigned to you in the current sprint
  List,
  /// Every issue on the board
  All,
  /// Unassigned issues in the current sprint
  Todo,
  /// Unassigned issues in the next sprint
  Backlog,
  /// The next unassigned issue of the current sprint, in full
  Pluck,
  /// Your issues, bypassing the cache
  Refresh,
  /// The issue of the checked-out branch
  Current,
  /// Current and next sprint
  Sprint,
  /// An issue with a table of its subtasks (default: current branch)
  Subtasks { issue: Option<String> },
  /// Hide an issue from board listings
  Hide { issue: String },
  /// Unhide an issue, or `ALL` to unhide everything
  Show { issue: String },
  /// Print the browser URL of an issue (default: current branch)
  Url {
    issue: Option<String>,

    /// Print the board URL instead
    #[arg(long, conflicts_with = "issue")]
    board: bool,
  },
  /// Resolve issue references and print their keys and summaries
  Keys {
    #[arg(required = true)]
    issues: Vec<String>,
  },
}
