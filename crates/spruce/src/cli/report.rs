use crate::cli::Cli;
use chrono::Utc;
use console::style;
use spruce_lib::report::{text, xml};
use spruce_lib::util::progress::create_spinner;
use spruce_lib::{
    build_report, build_usage_index, fetch_snapshot, required_types, ApiClient, ClassifyOptions,
    JamfClient, Preferences, ReportMeta, Result, CLIENT_LIBRARY_VERSION,
};

pub fn handle_report_command(client: &JamfClient, prefs: &Preferences, cli: &Cli) -> Result<()> {
    let requested = cli.requested_types();
    let needed = required_types(&requested);

    let spinner = create_spinner("Fetching inventory...");
    let snapshot = fetch_snapshot(client, &needed)?;
    spinner.finish_and_clear();

    let index = build_usage_index(&snapshot);

    let now = Utc::now();
    let opts = ClassifyOptions {
        keep_versions: cli.keep_versions.unwrap_or(prefs.keep_versions),
        stale_days: cli.stale_days.unwrap_or(prefs.stale_days),
        now,
    };
    let meta = ReportMeta {
        generated_at: now,
        server: client.server().to_string(),
        api_user: client.username().to_string(),
        local_user: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        client_version: CLIENT_LIBRARY_VERSION.to_string(),
    };

    let report = build_report(meta, &requested, &snapshot, &index, &opts);

    match &cli.ofile {
        Some(path) => {
            let doc = xml::write_report(&report)?;
            std::fs::write(path, doc)?;
            if !cli.quiet {
                println!(
                    "{} Report written to {}",
                    style("✓").green(),
                    path.display()
                );
            }
        }
        None => {
            print!("{}", text::render_text(&report, &snapshot, &index, cli.verbose));
        }
    }

    Ok(())
}
