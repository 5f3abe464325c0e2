//! Diagnostic logging to stderr.
//!
//! Normal output goes to stdout with `println!`; everything emitted through
//! `tracing` lands on stderr so it never mixes with command output.

use std::io::IsTerminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding an `EnvFilter` directive, e.g. `jt=debug`.
pub const LOG_ENV: &str = "JT_LOG";

/// Install the global subscriber.
///
/// The returned guard flushes buffered log lines when dropped, so keep it alive
/// until the program exits.
pub fn init(verbose: bool) -> WorkerGuard {
  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

  let fmt_layer = fmt::layer()
    .with_writer(writer)
    .with_target(verbose)
    .with_ansi(std::io::stderr().is_terminal());

  let installed = Registry::default()
    .with(env_filter(verbose))
    .with(fmt_layer)
    .try_init();
  if let Err(e) = installed {
    eprintln!("logging already initialized: {}", e);
  }

  guard
}

fn env_filter(verbose: bool) -> EnvFilter {
  if verbose {
    return EnvFilter::new(default_directive(true));
  }
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(false)))
}

fn default_directive(verbose: bool) -> &'static str {
  if verbose {
    "warn,jt=debug"
  } else {
    "warn"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_directives_parse() {
    for verbose in [false, true] {
      let directive = default_directive(verbose);
      assert!(EnvFilter::try_new(directive).is_ok(), "{}", directive);
    }
    assert!(default_directive(true).contains("jt=debug"));
  }
}
