use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use spruce_lib::removal::{self, RemovalOutcome, RemovalSummary};
use spruce_lib::report::xml;
use spruce_lib::{
    build_plan, execute_plan, fetch_summaries, JamfClient, ObjectType, RemovalRequest, Result,
    SpruceError,
};
use std::path::Path;

pub fn handle_remove_command(client: &JamfClient, path: &Path, quiet: bool) -> Result<()> {
    if !path.exists() {
        return Err(SpruceError::Config(format!(
            "Removal file '{}' does not exist",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let request = if looks_like_xml(&content) {
        xml::parse_removals(&content)?
    } else {
        resolve_legacy_request(client, &content)?
    };

    if request.items.is_empty() {
        println!("Nothing to remove.");
        return Ok(());
    }

    let plan = build_plan(&request, removal::interactive_decider())?;
    let summary = execute_plan(client, &plan);
    print_summary(&summary, quiet);

    Ok(())
}

fn looks_like_xml(content: &str) -> bool {
    content.trim_start().starts_with('<')
}

/// The historical plain-text list: names only, resolved against the live
/// inventory before anything is deleted.
fn resolve_legacy_request(client: &JamfClient, content: &str) -> Result<RemovalRequest> {
    log::warn!(
        "plain-text removal lists are deprecated and cannot disambiguate \
         same-named objects; prefer an edited -o/--ofile report"
    );

    #[allow(deprecated)]
    let items = removal::parse_legacy_list(content);
    let inventory = fetch_summaries(client, &[ObjectType::Package, ObjectType::Script])?;
    let (request, unmatched) = removal::resolve_legacy_items(&items, &inventory)?;

    for item in &unmatched {
        eprintln!(
            "{} no {} named {:?} on the server",
            style("!").yellow(),
            item.kind.human_name(),
            item.name
        );
    }

    Ok(request)
}

fn print_summary(summary: &RemovalSummary, quiet: bool) {
    if !quiet {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Type"),
            Cell::new("Id"),
            Cell::new("Name"),
            Cell::new("Outcome"),
        ]);
        for (item, outcome) in &summary.results {
            let outcome_cell = match outcome {
                RemovalOutcome::Deleted => Cell::new("deleted"),
                RemovalOutcome::Failed(reason) => Cell::new(format!("failed: {}", reason)),
                other => Cell::new(other.label()),
            };
            table.add_row(vec![
                Cell::new(item.kind.xml_tag()),
                Cell::new(item.id),
                Cell::new(&item.name),
                outcome_cell,
            ]);
        }
        println!("{}", table);
    }

    let counts = summary.counts();
    println!(
        "Deleted: {}  Not found: {}  Unsupported: {}  Failed: {}  Skipped: {}",
        style(counts.deleted).green(),
        counts.not_found,
        counts.unsupported,
        style(counts.failed).red(),
        counts.skipped
    );

    if summary.has_failures() {
        println!(
            "{} some items could not be removed; see the summary above",
            style("!").yellow()
        );
    }
}
