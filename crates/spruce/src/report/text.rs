//! Plain-text rendering of a report.
//!
//! Rendered into a `String` so the same bytes can go to STDOUT or into a
//! test assertion. Identical reports render identically.

use crate::graph::UsageIndex;
use crate::model::{ObjectType, Snapshot};
use crate::report::{Histogram, Report};
use crate::util::format::format_utc;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::fmt::Write;

pub fn render_text(
    report: &Report,
    snapshot: &Snapshot,
    index: &UsageIndex,
    verbose: bool,
) -> String {
    let mut out = String::new();

    writeln!(out, "Spruce report for {}", report.meta.server).unwrap();
    writeln!(
        out,
        "Generated {} by {} (local user {})",
        format_utc(&report.meta.generated_at),
        report.meta.api_user,
        report.meta.local_user
    )
    .unwrap();
    writeln!(
        out,
        "spruce {} / {}",
        report.meta.tool_version, report.meta.client_version
    )
    .unwrap();
    writeln!(out).unwrap();

    for section in &report.sections {
        writeln!(
            out,
            "{} {} ({} flagged of {}):",
            "#".repeat(10),
            section.kind.section_tag(),
            section.records.len(),
            section.total_objects
        )
        .unwrap();

        for record in &section.records {
            writeln!(
                out,
                "  [{:>5}] rank {:>2}  {}  ({})",
                record.object.id,
                record.rank,
                record.object.name,
                record.reason_list()
            )
            .unwrap();
        }
        writeln!(out).unwrap();

        if verbose {
            render_inventory_listing(&mut out, section.kind, snapshot, index);
        }
    }

    render_summary(&mut out, report);

    if !index.diagnostics().is_empty() {
        writeln!(out, "{} Diagnostics:", "#".repeat(10)).unwrap();
        for diagnostic in index.diagnostics() {
            writeln!(out, "  {}", diagnostic).unwrap();
        }
        writeln!(out).unwrap();
    }

    out
}

/// The original report tool's verbose mode: all objects and the in-use
/// subset, sorted without regard to case.
fn render_inventory_listing(
    out: &mut String,
    kind: ObjectType,
    snapshot: &Snapshot,
    index: &UsageIndex,
) {
    let objects = snapshot.objects(kind);

    let mut all: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
    all.sort_by_key(|name| name.to_uppercase());

    let mut used: Vec<&str> = objects
        .iter()
        .filter(|o| index.is_used(o.identity()))
        .map(|o| o.name.as_str())
        .collect();
    used.sort_by_key(|name| name.to_uppercase());

    writeln!(out, "{} All {}:", "#".repeat(10), kind.section_tag()).unwrap();
    for name in all {
        writeln!(out, "{}", name).unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "{} Used {}:", "#".repeat(10), kind.section_tag()).unwrap();
    for name in used {
        writeln!(out, "{}", name).unwrap();
    }
    writeln!(out).unwrap();
}

fn render_summary(out: &mut String, report: &Report) {
    writeln!(out, "{} Summary:", "#".repeat(10)).unwrap();

    let mut sections_table = Table::new();
    sections_table.load_preset(UTF8_FULL);
    sections_table.set_header(vec![
        Cell::new("Section"),
        Cell::new("Objects"),
        Cell::new("Flagged"),
    ]);
    for section in &report.sections {
        sections_table.add_row(vec![
            Cell::new(section.kind.section_tag()),
            Cell::new(section.total_objects),
            Cell::new(section.records.len()),
        ]);
    }
    writeln!(out, "{}", sections_table).unwrap();

    if !report.summary.rank_counts.is_empty() {
        let mut rank_table = Table::new();
        rank_table.load_preset(UTF8_FULL);
        rank_table.set_header(vec![Cell::new("Rank"), Cell::new("Records")]);
        for (rank, count) in &report.summary.rank_counts {
            rank_table.add_row(vec![Cell::new(rank), Cell::new(count)]);
        }
        writeln!(out, "{}", rank_table).unwrap();

        let mut reason_table = Table::new();
        reason_table.load_preset(UTF8_FULL);
        reason_table.set_header(vec![Cell::new("Reason"), Cell::new("Records")]);
        for (reason, count) in &report.summary.reason_counts {
            reason_table.add_row(vec![Cell::new(reason.as_str()), Cell::new(count)]);
        }
        writeln!(out, "{}", reason_table).unwrap();
    }

    for histogram in &report.summary.histograms {
        render_histogram(out, histogram);
    }
    writeln!(out).unwrap();
}

fn render_histogram(out: &mut String, histogram: &Histogram) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![Cell::new(&histogram.title), Cell::new("Count")]);
    for (bucket, count) in &histogram.buckets {
        table.add_row(vec![Cell::new(bucket), Cell::new(count)]);
    }
    writeln!(out, "{}", table).unwrap();
}
