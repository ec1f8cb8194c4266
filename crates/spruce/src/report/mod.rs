//! Report assembly.
//!
//! Merges classifier output for the requested kinds into one immutable
//! [`Report`]. Everything here is deterministic: sections follow the kind
//! enumeration order, records are already rank-then-id ordered, and the
//! summary buckets live in ordered maps, so identical snapshots always
//! produce identical reports.

pub mod text;
pub mod xml;

use crate::classify::{classify_kind, ClassifyOptions, CruftReason, CruftRecord};
use crate::graph::UsageIndex;
use crate::model::{ObjectDetail, ObjectType, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub generated_at: DateTime<Utc>,
    pub server: String,
    pub api_user: String,
    pub local_user: String,
    pub tool_version: String,
    pub client_version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub kind: ObjectType,
    /// Objects of this kind that were fetched, for the flagged-of-total
    /// counts and the verbose listing.
    pub total_objects: usize,
    pub records: Vec<CruftRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub title: String,
    pub buckets: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportSummary {
    pub rank_counts: BTreeMap<u32, usize>,
    pub reason_counts: BTreeMap<CruftReason, usize>,
    pub histograms: Vec<Histogram>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub meta: ReportMeta,
    pub sections: Vec<ReportSection>,
    pub summary: ReportSummary,
}

impl Report {
    pub fn records(&self) -> impl Iterator<Item = &CruftRecord> {
        self.sections.iter().flat_map(|s| s.records.iter())
    }
}

pub fn build_report(
    meta: ReportMeta,
    requested: &[ObjectType],
    snapshot: &Snapshot,
    index: &UsageIndex,
    opts: &ClassifyOptions,
) -> Report {
    let mut sections = Vec::new();
    for kind in ObjectType::ALL {
        if !requested.contains(&kind) {
            continue;
        }
        sections.push(ReportSection {
            kind,
            total_objects: snapshot.objects(kind).len(),
            records: classify_kind(kind, snapshot, index, opts),
        });
    }

    let summary = summarize(&sections, requested, snapshot);
    Report {
        meta,
        sections,
        summary,
    }
}

fn summarize(
    sections: &[ReportSection],
    requested: &[ObjectType],
    snapshot: &Snapshot,
) -> ReportSummary {
    let mut summary = ReportSummary::default();

    for record in sections.iter().flat_map(|s| s.records.iter()) {
        *summary.rank_counts.entry(record.rank).or_default() += 1;
        for reason in &record.reasons {
            *summary.reason_counts.entry(*reason).or_default() += 1;
        }
    }

    for kind in [ObjectType::Computer, ObjectType::MobileDevice] {
        if requested.contains(&kind) && snapshot.contains(kind) {
            summary
                .histograms
                .push(os_version_histogram(kind, snapshot));
            summary
                .histograms
                .push(check_in_histogram(kind, snapshot));
        }
    }

    summary
}

fn os_version_histogram(kind: ObjectType, snapshot: &Snapshot) -> Histogram {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for object in snapshot.objects(kind) {
        let bucket = match &object.detail {
            Some(ObjectDetail::Device(device)) => device
                .os_version
                .as_deref()
                .map(major_minor)
                .unwrap_or_else(|| "unknown".to_string()),
            _ => "unknown".to_string(),
        };
        *buckets.entry(bucket).or_default() += 1;
    }
    Histogram {
        title: format!("{} OS version spread", kind),
        buckets,
    }
}

fn check_in_histogram(kind: ObjectType, snapshot: &Snapshot) -> Histogram {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for object in snapshot.objects(kind) {
        let bucket = match &object.detail {
            Some(ObjectDetail::Device(device)) => device
                .last_check_in
                .map(|t| t.format("%Y-%m").to_string())
                .unwrap_or_else(|| "never".to_string()),
            _ => "never".to_string(),
        };
        *buckets.entry(bucket).or_default() += 1;
    }
    Histogram {
        title: format!("{} last check-in month", kind),
        buckets,
    }
}

fn major_minor(version: &str) -> String {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{}.{}", major, minor),
        (Some(major), None) => major.to_string(),
        _ => "unknown".to_string(),
    }
}
