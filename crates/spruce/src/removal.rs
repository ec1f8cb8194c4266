//! The removal workflow.
//!
//! A parsed [`RemovalRequest`] moves through three stages: grouping and
//! per-type confirmation into a [`RemovalPlan`], execution of the approved
//! groups against the server, and a final [`RemovalSummary`]. Confirmation
//! is separated from execution so the plan can be built and tested with any
//! decider, not just a live terminal prompt.

use crate::api::{with_retries, ApiClient, ApiError};
use crate::error::{Result, SpruceError};
use crate::model::{ObjectType, Snapshot};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalItem {
    pub kind: ObjectType,
    pub id: u32,
    /// Advisory display name; never a removal key.
    pub name: String,
}

/// Parsed from an interchange document or a resolved legacy list.
/// Consumed exactly once by the executor and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalRequest {
    pub items: Vec<RemovalItem>,
}

#[derive(Debug, Clone)]
pub struct PlanGroup {
    pub kind: ObjectType,
    pub approved: bool,
    pub items: Vec<RemovalItem>,
}

/// The confirmed, type-grouped subset of a request.
#[derive(Debug, Clone, Default)]
pub struct RemovalPlan {
    pub groups: Vec<PlanGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemovalOutcome {
    Deleted,
    NotFound,
    Unsupported,
    Failed(String),
    Skipped,
}

impl RemovalOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RemovalOutcome::Deleted => "deleted",
            RemovalOutcome::NotFound => "not found",
            RemovalOutcome::Unsupported => "unsupported",
            RemovalOutcome::Failed(_) => "failed",
            RemovalOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutcomeCounts {
    pub deleted: usize,
    pub not_found: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct RemovalSummary {
    /// One entry per requested item, in plan order.
    pub results: Vec<(RemovalItem, RemovalOutcome)>,
}

impl RemovalSummary {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for (_, outcome) in &self.results {
            match outcome {
                RemovalOutcome::Deleted => counts.deleted += 1,
                RemovalOutcome::NotFound => counts.not_found += 1,
                RemovalOutcome::Unsupported => counts.unsupported += 1,
                RemovalOutcome::Failed(_) => counts.failed += 1,
                RemovalOutcome::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Per-item trouble worth surfacing. Never fatal for the run.
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|(_, outcome)| {
            matches!(
                outcome,
                RemovalOutcome::Failed(_) | RemovalOutcome::Unsupported | RemovalOutcome::NotFound
            )
        })
    }
}

/// Group a request by object type, in the fixed type enumeration order, and
/// ask `decide` once per type. Declined groups stay in the plan, marked
/// unapproved, so their items surface as skipped.
pub fn build_plan<F>(request: &RemovalRequest, mut decide: F) -> Result<RemovalPlan>
where
    F: FnMut(ObjectType, &[RemovalItem]) -> Result<bool>,
{
    let mut grouped: BTreeMap<ObjectType, Vec<RemovalItem>> = BTreeMap::new();
    for item in &request.items {
        grouped.entry(item.kind).or_default().push(item.clone());
    }

    let mut groups = Vec::new();
    for (kind, items) in grouped {
        let approved = decide(kind, &items)?;
        if !approved {
            log::info!("declined removal of {} {}", items.len(), kind.human_plural());
        }
        groups.push(PlanGroup {
            kind,
            approved,
            items,
        });
    }
    Ok(RemovalPlan { groups })
}

/// Terminal decider: show the group, ask for an explicit yes. Defaults to
/// no.
pub fn interactive_decider() -> impl FnMut(ObjectType, &[RemovalItem]) -> Result<bool> {
    let theme = ColorfulTheme::default();
    move |kind, items| {
        println!(
            "\n{} {} queued for removal:",
            style(items.len()).bold(),
            kind.human_plural()
        );
        for item in items {
            println!("  [{:>5}] {}", item.id, item.name);
        }
        Confirm::with_theme(&theme)
            .with_prompt(format!("Remove these {}?", kind.human_plural()))
            .default(false)
            .interact()
            .map_err(SpruceError::from)
    }
}

/// Apply a plan. Deletes go one at a time; an item that cannot be deleted
/// is recorded and never interrupts its siblings.
pub fn execute_plan(client: &dyn ApiClient, plan: &RemovalPlan) -> RemovalSummary {
    let mut summary = RemovalSummary::default();

    for group in &plan.groups {
        if !group.approved {
            for item in &group.items {
                summary.results.push((item.clone(), RemovalOutcome::Skipped));
            }
            continue;
        }

        for item in &group.items {
            let outcome = match with_retries(|| client.delete_object(item.kind, item.id)) {
                Ok(()) => {
                    log::info!("deleted {} {} ({})", item.kind, item.id, item.name);
                    RemovalOutcome::Deleted
                }
                Err(ApiError::NotFound) => RemovalOutcome::NotFound,
                Err(ApiError::Unsupported(reason)) => {
                    log::warn!(
                        "server cannot delete {} {}: {}",
                        item.kind,
                        item.id,
                        reason
                    );
                    RemovalOutcome::Unsupported
                }
                Err(err) => RemovalOutcome::Failed(err.to_string()),
            };
            summary.results.push((item.clone(), outcome));
        }
    }

    summary
}

/// An entry from the historical plain-text removal list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyItem {
    pub kind: ObjectType,
    pub name: String,
}

/// Parse the historical one-filename-per-line removal list. Lines starting
/// with a space, tab, or `#`, and blank lines, are ignored. `.pkg` and
/// `.dmg` names are packages, everything else is a script.
#[deprecated(
    note = "plain-text lists cannot disambiguate same-named objects; use the XML interchange document"
)]
pub fn parse_legacy_list(text: &str) -> Vec<LegacyItem> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with([' ', '\t', '#']))
        .map(|line| {
            let lower = line.to_lowercase();
            let kind = if lower.ends_with(".pkg") || lower.ends_with(".dmg") {
                ObjectType::Package
            } else {
                ObjectType::Script
            };
            LegacyItem {
                kind,
                name: line.to_string(),
            }
        })
        .collect()
}

/// Resolve legacy names against the live inventory. A name carried by more
/// than one object of its type is fatal; a name matching nothing is
/// returned for the caller to surface.
pub fn resolve_legacy_items(
    items: &[LegacyItem],
    inventory: &Snapshot,
) -> Result<(RemovalRequest, Vec<LegacyItem>)> {
    let mut request = RemovalRequest::default();
    let mut unmatched = Vec::new();

    for item in items {
        let matches: Vec<_> = inventory
            .objects(item.kind)
            .iter()
            .filter(|o| o.name == item.name)
            .collect();
        match matches.as_slice() {
            [] => unmatched.push(item.clone()),
            [object] => request.items.push(RemovalItem {
                kind: item.kind,
                id: object.id,
                name: object.name.clone(),
            }),
            _ => {
                return Err(SpruceError::MalformedRemovals(format!(
                    "name {:?} matches {} {}; edit an XML report to remove by id",
                    item.name,
                    matches.len(),
                    item.kind.human_plural()
                )))
            }
        }
    }

    Ok((request, unmatched))
}
