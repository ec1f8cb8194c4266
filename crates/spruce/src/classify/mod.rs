//! Per-kind cruft classification.
//!
//! One strategy per object kind, all behind [`classify_kind`]. Every
//! strategy starts from the usage index (zero entries under the kind's
//! usage definition means "unused") and layers on kind-specific signals:
//! superseded package versions, empty group membership, unscoped policies
//! and profiles, stale device check-ins. An object can accumulate several
//! reasons; its rank is the sum of their severity weights, so rank grows
//! with both the number and the gravity of signals.

pub mod versions;

use crate::graph::UsageIndex;
use crate::model::{ManagedObject, ObjectDetail, ObjectType, Snapshot};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use versions::{parse_package_name, VersionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CruftReason {
    Unused,
    SupersededVersion,
    EmptyMembership,
    Unscoped,
    Stale,
}

impl CruftReason {
    /// Fixed severity weight. Distinct per reason; rank sums these.
    pub fn weight(self) -> u32 {
        match self {
            CruftReason::Unused => 5,
            CruftReason::SupersededVersion => 4,
            CruftReason::EmptyMembership => 3,
            CruftReason::Unscoped => 2,
            CruftReason::Stale => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CruftReason::Unused => "unused",
            CruftReason::SupersededVersion => "superseded-version",
            CruftReason::EmptyMembership => "empty-membership",
            CruftReason::Unscoped => "unscoped",
            CruftReason::Stale => "stale",
        }
    }
}

// Severest first, so iterating a reason set lists the strongest signal
// first.
impl Ord for CruftReason {
    fn cmp(&self, other: &Self) -> Ordering {
        other.weight().cmp(&self.weight())
    }
}

impl PartialOrd for CruftReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CruftRecord {
    pub object: ManagedObject,
    pub reasons: BTreeSet<CruftReason>,
    pub rank: u32,
}

impl CruftRecord {
    pub fn reason_list(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Newest versions retained per package base name.
    pub keep_versions: usize,
    /// Check-in age beyond which a device is stale.
    pub stale_days: i64,
    /// Injected so identical snapshots classify identically.
    pub now: DateTime<Utc>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            keep_versions: crate::config::DEFAULT_KEEP_VERSIONS,
            stale_days: crate::config::DEFAULT_STALE_DAYS,
            now: Utc::now(),
        }
    }
}

/// Classify every fetched object of `kind`.
///
/// Records come back ordered by ascending rank, then ascending id. Objects
/// with blank names are classified like any other.
pub fn classify_kind(
    kind: ObjectType,
    snapshot: &Snapshot,
    index: &UsageIndex,
    opts: &ClassifyOptions,
) -> Vec<CruftRecord> {
    let objects = snapshot.objects(kind);
    let mut reasons: BTreeMap<u32, BTreeSet<CruftReason>> = BTreeMap::new();

    for object in objects {
        if !index.is_used(object.identity()) {
            reasons.entry(object.id).or_default().insert(CruftReason::Unused);
        }
    }

    match kind {
        ObjectType::Package => {
            let mut groups: BTreeMap<String, Vec<(u32, Option<VersionKey>)>> = BTreeMap::new();
            for object in objects {
                let parsed = parse_package_name(&object.name);
                groups
                    .entry(parsed.base.to_lowercase())
                    .or_default()
                    .push((object.id, parsed.version));
            }
            apply_version_redundancy(groups, kind, index, opts, &mut reasons);
        }
        ObjectType::MobileApplication => {
            let mut groups: BTreeMap<String, Vec<(u32, Option<VersionKey>)>> = BTreeMap::new();
            for object in objects {
                let version = match &object.detail {
                    Some(ObjectDetail::MobileApplication(app)) => {
                        app.version.as_deref().map(VersionKey::parse)
                    }
                    _ => None,
                };
                groups
                    .entry(object.name.to_lowercase())
                    .or_default()
                    .push((object.id, version));
            }
            apply_version_redundancy(groups, kind, index, opts, &mut reasons);
        }
        ObjectType::ComputerGroup | ObjectType::MobileDeviceGroup => {
            for object in objects {
                if let Some(ObjectDetail::Group(group)) = &object.detail {
                    if group.member_ids.is_empty() {
                        reasons
                            .entry(object.id)
                            .or_default()
                            .insert(CruftReason::EmptyMembership);
                    }
                }
            }
        }
        ObjectType::Policy
        | ObjectType::ComputerConfigurationProfile
        | ObjectType::MobileDeviceConfigurationProfile => {
            for object in objects {
                let scope = match &object.detail {
                    Some(ObjectDetail::Policy(policy)) => Some(&policy.scope),
                    Some(ObjectDetail::Profile(profile)) => Some(&profile.scope),
                    _ => None,
                };
                if scope.is_some_and(|s| s.is_empty()) {
                    reasons.entry(object.id).or_default().insert(CruftReason::Unscoped);
                }
            }
        }
        ObjectType::Computer | ObjectType::MobileDevice => {
            let cutoff = opts.now - Duration::days(opts.stale_days);
            for object in objects {
                let last_check_in = match &object.detail {
                    Some(ObjectDetail::Device(device)) => device.last_check_in,
                    _ => None,
                };
                // A device that never checked in is maximally stale.
                if last_check_in.map_or(true, |t| t < cutoff) {
                    reasons.entry(object.id).or_default().insert(CruftReason::Stale);
                }
            }
        }
        ObjectType::Script => {}
    }

    let mut records: Vec<CruftRecord> = objects
        .iter()
        .filter_map(|object| {
            let reasons = reasons.remove(&object.id)?;
            let rank = reasons.iter().map(|r| r.weight()).sum();
            Some(CruftRecord {
                object: object.clone(),
                reasons,
                rank,
            })
        })
        .collect();

    records.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.object.id.cmp(&b.object.id)));
    records
}

/// Within each base-name group, keep the newest N versions and flag the
/// rest, provided the newest retained one is actually in use. Identical
/// version strings tie-break by id: the lower id is retained.
fn apply_version_redundancy(
    groups: BTreeMap<String, Vec<(u32, Option<VersionKey>)>>,
    kind: ObjectType,
    index: &UsageIndex,
    opts: &ClassifyOptions,
    reasons: &mut BTreeMap<u32, BTreeSet<CruftReason>>,
) {
    let keep = opts.keep_versions.max(1);

    for (_, mut members) in groups {
        if members.len() <= keep {
            continue;
        }
        members.sort_by(version_desc_then_id);
        // A group with no parseable version on its newest member is a name
        // collision, not a version lineage.
        if members[0].1.is_none() {
            continue;
        }
        let newest = crate::model::ObjectIdentity::new(kind, members[0].0);
        if !index.is_used(newest) {
            continue;
        }
        for (id, _) in members.iter().skip(keep) {
            reasons
                .entry(*id)
                .or_default()
                .insert(CruftReason::SupersededVersion);
        }
    }
}

fn version_desc_then_id(a: &(u32, Option<VersionKey>), b: &(u32, Option<VersionKey>)) -> Ordering {
    match (&a.1, &b.1) {
        (Some(va), Some(vb)) => vb.cmp(va).then(a.0.cmp(&b.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    }
}
