//! loopterm entrypoint: validate the environment, take over the terminal,
//! and run the session loop until interrupted.

use anyhow::Result;
use clap::Parser;
use loopterm::config::AppConfig;
use loopterm::logging;
use loopterm::run_loop;
use loopterm::tui::Tui;
use tracing::info;

fn main() -> Result<()> {
    let config = AppConfig::parse();
    config.validate()?;
    config.check_environment()?;
    logging::init_tracing(&config);
    info!(
        output = %config.output_path.display(),
        continue_session = config.continue_session,
        "starting loopterm"
    );

    let mut tui = Tui::new()?;
    run_loop::run(&config, &mut tui)
}
