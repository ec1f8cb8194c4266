mod cli;

use clap::Parser;
use console::style;
use spruce_lib::{ApiClient, JamfClient, Preferences, Result, SpruceError};

fn main() {
    let cli = cli::Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(&cli) {
        eprintln!("{} {}", style("error:").red().bold(), err);
        std::process::exit(1);
    }
}

fn init_logging(cli: &cli::Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &cli::Cli) -> Result<()> {
    let prefs = Preferences::load(cli.prefs.as_deref())?;
    let client = JamfClient::new(&prefs)?;

    // One authenticated round-trip before any work; a dead or rejecting
    // server aborts the whole invocation here.
    client.probe().map_err(|err| SpruceError::Connection {
        server: client.server().to_string(),
        reason: err.to_string(),
    })?;

    match &cli.remove {
        Some(path) => cli::remove::handle_remove_command(&client, path, cli.quiet),
        None => cli::report::handle_report_command(&client, &prefs, cli),
    }
}
