use calmmind::cli::{self, Cli, Commands};
use calmmind::{Config, Organizer, Profile, logging};
use clap::Parser;
use color_eyre::Result;
use std::io;
use std::path::PathBuf;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps config and data apart from the real ones
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config_path = match cli.config {
        Some(ref path) => calmmind::utils::expand_path(path),
        None => Config::get_config_path(profile)?,
    };
    let config = Config::load_from(&config_path, profile)?;

    // Held until exit so buffered log lines are flushed
    let _log_guard = logging::init(&Config::get_log_dir(profile), &config.log_level)?;
    tracing::info!(config = %config_path.display(), ?profile, "starting calmmind");

    let organizer = Organizer::open(config.get_data_path(), config.reminder_engine())?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(config, config_path, organizer)?,
        command => cli::run(command, &organizer, &config, &mut io::stdout())?,
    }

    Ok(())
}

fn run_tui(config: Config, config_path: PathBuf, organizer: Organizer) -> Result<()> {
    let app = calmmind::tui::App::new(config, Some(config_path), organizer)?;
    calmmind::tui::run_event_loop(app)?;
    Ok(())
}
