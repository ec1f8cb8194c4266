//! Reverse-reference index over a fetched snapshot.
//!
//! Built in two passes: collect every usage edge from the container-capable
//! kinds, then fold the edges into a reverse index. A container whose
//! reference data is malformed contributes no edges and a diagnostic; it
//! never aborts the build.

use crate::model::{
    ManagedObject, ObjectDetail, ObjectIdentity, ObjectType, Scope, Snapshot,
};
use std::collections::{BTreeMap, BTreeSet};

/// For every referenced object, the set of containers referencing it.
/// Scoped containers (policies, profiles, mobile applications) additionally
/// appear in `deployed` when their own scope is non-empty, which is their
/// usage definition.
#[derive(Debug, Default)]
pub struct UsageIndex {
    used_by: BTreeMap<ObjectIdentity, BTreeSet<ObjectIdentity>>,
    deployed: BTreeSet<ObjectIdentity>,
    diagnostics: Vec<String>,
}

impl UsageIndex {
    /// Whether the object is in use under its type's usage definition.
    pub fn is_used(&self, identity: ObjectIdentity) -> bool {
        if identity.kind.is_scoped_container() {
            self.deployed.contains(&identity)
        } else {
            self.used_by.contains_key(&identity)
        }
    }

    /// Containers referencing the object. Empty for scoped containers,
    /// whose usage comes from their own deployment scope.
    pub fn referencers(&self, identity: ObjectIdentity) -> Option<&BTreeSet<ObjectIdentity>> {
        self.used_by.get(&identity)
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

struct Edge {
    container: ObjectIdentity,
    referenced: ObjectIdentity,
}

pub fn build_usage_index(snapshot: &Snapshot) -> UsageIndex {
    let mut edges = Vec::new();
    let mut deployed = BTreeSet::new();
    let mut diagnostics = Vec::new();

    for kind in ObjectType::ALL.iter().copied().filter(|k| k.is_container()) {
        for object in snapshot.objects(kind) {
            collect_edges(object, &mut edges, &mut deployed, &mut diagnostics);
        }
    }

    let mut used_by: BTreeMap<ObjectIdentity, BTreeSet<ObjectIdentity>> = BTreeMap::new();
    for edge in edges {
        used_by.entry(edge.referenced).or_default().insert(edge.container);
    }

    UsageIndex {
        used_by,
        deployed,
        diagnostics,
    }
}

fn collect_edges(
    object: &ManagedObject,
    edges: &mut Vec<Edge>,
    deployed: &mut BTreeSet<ObjectIdentity>,
    diagnostics: &mut Vec<String>,
) {
    let container = object.identity();
    let mut push = |kind: ObjectType, ids: &[u32]| {
        for id in ids {
            edges.push(Edge {
                container,
                referenced: ObjectIdentity::new(kind, *id),
            });
        }
    };

    match (object.kind, &object.detail) {
        (ObjectType::Policy, Some(ObjectDetail::Policy(policy))) => {
            push(ObjectType::Package, &policy.package_ids);
            push(ObjectType::Script, &policy.script_ids);
            push(ObjectType::ComputerGroup, &policy.scope.group_ids);
            push(ObjectType::Computer, &policy.scope.target_ids);
            mark_deployed(container, &policy.scope, deployed);
        }
        (ObjectType::ComputerConfigurationProfile, Some(ObjectDetail::Profile(profile))) => {
            push(ObjectType::ComputerGroup, &profile.scope.group_ids);
            push(ObjectType::Computer, &profile.scope.target_ids);
            mark_deployed(container, &profile.scope, deployed);
        }
        (ObjectType::MobileDeviceConfigurationProfile, Some(ObjectDetail::Profile(profile))) => {
            push(ObjectType::MobileDeviceGroup, &profile.scope.group_ids);
            push(ObjectType::MobileDevice, &profile.scope.target_ids);
            mark_deployed(container, &profile.scope, deployed);
        }
        (ObjectType::MobileApplication, Some(ObjectDetail::MobileApplication(app))) => {
            push(ObjectType::MobileDeviceGroup, &app.scope.group_ids);
            push(ObjectType::MobileDevice, &app.scope.target_ids);
            mark_deployed(container, &app.scope, deployed);
        }
        (ObjectType::ComputerGroup, Some(ObjectDetail::Group(group))) => {
            push(ObjectType::Computer, &group.member_ids);
        }
        (ObjectType::MobileDeviceGroup, Some(ObjectDetail::Group(group))) => {
            push(ObjectType::MobileDevice, &group.member_ids);
        }
        _ => {
            let message = format!(
                "{} {} ({:?}) has no usable reference data; skipping its edges",
                object.kind, object.id, object.name
            );
            log::warn!("{}", message);
            diagnostics.push(message);
        }
    }
}

fn mark_deployed(container: ObjectIdentity, scope: &Scope, deployed: &mut BTreeSet<ObjectIdentity>) {
    if !scope.is_empty() {
        deployed.insert(container);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupDetail, PolicyDetail, ProfileDetail};

    fn object(kind: ObjectType, id: u32, detail: Option<ObjectDetail>) -> ManagedObject {
        ManagedObject {
            kind,
            id,
            name: format!("{} {}", kind, id),
            detail,
        }
    }

    fn policy(id: u32, package_ids: Vec<u32>, scope: Scope) -> ManagedObject {
        object(
            ObjectType::Policy,
            id,
            Some(ObjectDetail::Policy(PolicyDetail {
                enabled: true,
                package_ids,
                script_ids: vec![],
                scope,
            })),
        )
    }

    #[test]
    fn test_policy_references_packages_and_scope() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ObjectType::Policy,
            vec![policy(
                1,
                vec![10],
                Scope {
                    all_targets: false,
                    group_ids: vec![4],
                    target_ids: vec![7],
                },
            )],
        );

        let index = build_usage_index(&snapshot);
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Package, 10)));
        assert!(index.is_used(ObjectIdentity::new(ObjectType::ComputerGroup, 4)));
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Computer, 7)));
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Policy, 1)));
        assert!(!index.is_used(ObjectIdentity::new(ObjectType::Package, 11)));
    }

    #[test]
    fn test_unscoped_policy_is_not_deployed() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(ObjectType::Policy, vec![policy(1, vec![10], Scope::default())]);

        let index = build_usage_index(&snapshot);
        // The package is referenced even though the policy reaches nothing.
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Package, 10)));
        assert!(!index.is_used(ObjectIdentity::new(ObjectType::Policy, 1)));
    }

    #[test]
    fn test_malformed_container_is_skipped_with_diagnostic() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ObjectType::Policy,
            vec![policy(1, vec![10], Scope::default()), object(ObjectType::Policy, 2, None)],
        );

        let index = build_usage_index(&snapshot);
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Package, 10)));
        assert_eq!(index.diagnostics().len(), 1);
        assert!(index.diagnostics()[0].contains("Policy 2"));
    }

    #[test]
    fn test_group_membership_marks_devices_used() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ObjectType::ComputerGroup,
            vec![object(
                ObjectType::ComputerGroup,
                3,
                Some(ObjectDetail::Group(GroupDetail {
                    is_smart: false,
                    member_ids: vec![31, 32],
                })),
            )],
        );

        let index = build_usage_index(&snapshot);
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Computer, 31)));
        assert!(index.is_used(ObjectIdentity::new(ObjectType::Computer, 32)));
        let users = index
            .referencers(ObjectIdentity::new(ObjectType::Computer, 31))
            .unwrap();
        assert!(users.contains(&ObjectIdentity::new(ObjectType::ComputerGroup, 3)));
    }

    #[test]
    fn test_all_targets_scope_counts_as_deployed() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ObjectType::ComputerConfigurationProfile,
            vec![object(
                ObjectType::ComputerConfigurationProfile,
                9,
                Some(ObjectDetail::Profile(ProfileDetail {
                    scope: Scope {
                        all_targets: true,
                        group_ids: vec![],
                        target_ids: vec![],
                    },
                })),
            )],
        );

        let index = build_usage_index(&snapshot);
        assert!(index.is_used(ObjectIdentity::new(
            ObjectType::ComputerConfigurationProfile,
            9
        )));
    }
}
