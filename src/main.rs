use color_eyre::Result;

use jt::app::App;
use jt::cli::Args;
use jt::config::Config;
use jt::logging;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse_checked();
  let _log_guard = logging::init(args.verbose);

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let mut app = App::new(config)?;
  app.run(&args).await?;

  Ok(())
}
