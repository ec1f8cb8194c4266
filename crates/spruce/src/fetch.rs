//! Inventory fetching.
//!
//! Lists each required kind, then pulls per-object details over a bounded
//! worker pool. The snapshot a run works from is whatever this pass
//! returns; nothing is cached between runs, and an object deleted by
//! another administrator mid-fetch simply drops out.

use crate::api::{with_retries, ApiClient, ApiError, ObjectRef};
use crate::error::{Result, SpruceError};
use crate::model::{ManagedObject, ObjectType, Snapshot};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Detail fetches in flight at once. Sized to stay polite to the server.
pub const FETCH_WORKERS: usize = 4;

/// The kinds that must be fetched to serve a report over `requested`.
///
/// A report on referencable objects needs the full reference data of every
/// container kind that can point at them, even when those containers are
/// not themselves reported on.
pub fn required_types(requested: &[ObjectType]) -> Vec<ObjectType> {
    use ObjectType::*;

    let mut needed: BTreeSet<ObjectType> = requested.iter().copied().collect();
    for kind in requested {
        let containers: &[ObjectType] = match kind {
            Package | Script => &[Policy],
            ComputerGroup => &[Policy, ComputerConfigurationProfile],
            MobileDeviceGroup => &[MobileDeviceConfigurationProfile, MobileApplication],
            Computer => &[ComputerGroup, Policy, ComputerConfigurationProfile],
            MobileDevice => &[
                MobileDeviceGroup,
                MobileDeviceConfigurationProfile,
                MobileApplication,
            ],
            Policy
            | ComputerConfigurationProfile
            | MobileDeviceConfigurationProfile
            | MobileApplication => &[],
        };
        needed.extend(containers);
    }
    needed.into_iter().collect()
}

/// Fetch all `kinds` into a fresh snapshot.
///
/// Listing a kind must succeed; a single object's detail fetch may fail
/// without sinking the run (the object is kept without its payload, or
/// dropped if the server says it no longer exists).
pub fn fetch_snapshot(client: &dyn ApiClient, kinds: &[ObjectType]) -> Result<Snapshot> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(FETCH_WORKERS)
        .build()
        .map_err(|e| SpruceError::Runtime(format!("failed to build fetch pool: {}", e)))?;

    let mut snapshot = Snapshot::new();
    for kind in kinds {
        let refs =
            with_retries(|| client.list_objects(*kind)).map_err(|e| list_error(client, *kind, e))?;
        log::info!("fetched {} {} entries", refs.len(), kind.human_name());

        let objects: Vec<ManagedObject> = pool.install(|| {
            refs.par_iter()
                .filter_map(|summary| fetch_one(client, *kind, summary))
                .collect()
        });
        snapshot.insert(*kind, objects);
    }
    Ok(snapshot)
}

/// Fetch only `(id, name)` summaries for `kinds`, without detail payloads.
/// Enough for resolving names against the live inventory.
pub fn fetch_summaries(client: &dyn ApiClient, kinds: &[ObjectType]) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    for kind in kinds {
        let refs =
            with_retries(|| client.list_objects(*kind)).map_err(|e| list_error(client, *kind, e))?;
        snapshot.insert(
            *kind,
            refs.into_iter()
                .map(|summary| ManagedObject {
                    kind: *kind,
                    id: summary.id,
                    name: summary.name,
                    detail: None,
                })
                .collect(),
        );
    }
    Ok(snapshot)
}

fn fetch_one(client: &dyn ApiClient, kind: ObjectType, summary: &ObjectRef) -> Option<ManagedObject> {
    match with_retries(|| client.fetch_detail(kind, summary.id)) {
        Ok(object) => Some(object),
        Err(ApiError::NotFound) => {
            log::info!(
                "{} {} ({}) disappeared during the run; dropping it",
                kind,
                summary.id,
                summary.name
            );
            None
        }
        Err(err) => {
            log::warn!(
                "could not fetch detail for {} {} ({}): {}",
                kind,
                summary.id,
                summary.name,
                err
            );
            Some(ManagedObject {
                kind,
                id: summary.id,
                name: summary.name.clone(),
                detail: None,
            })
        }
    }
}

/// Losing a whole object listing leaves nothing to report on; that is
/// fatal, unlike a single object's detail.
fn list_error(client: &dyn ApiClient, kind: ObjectType, err: ApiError) -> SpruceError {
    match err {
        ApiError::Auth(reason) | ApiError::Connection(reason) => SpruceError::Connection {
            server: client.server().to_string(),
            reason,
        },
        other => SpruceError::Runtime(format!("failed to list {}: {}", kind.human_plural(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResult;
    use crate::model::{ObjectDetail, ScriptDetail};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FlakyClient {
        objects: BTreeMap<(ObjectType, u32), ManagedObject>,
        detail_failures: BTreeMap<(ObjectType, u32), ApiError>,
        list_attempts: Mutex<u32>,
        list_transient_failures: u32,
    }

    impl ApiClient for FlakyClient {
        fn server(&self) -> &str {
            "https://jss.test"
        }

        fn username(&self) -> &str {
            "tester"
        }

        fn probe(&self) -> ApiResult<()> {
            Ok(())
        }

        fn list_objects(&self, kind: ObjectType) -> ApiResult<Vec<ObjectRef>> {
            let mut attempts = self.list_attempts.lock().unwrap();
            *attempts += 1;
            if *attempts <= self.list_transient_failures {
                return Err(ApiError::Transient("busy".into()));
            }
            Ok(self
                .objects
                .iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|((_, id), object)| ObjectRef {
                    id: *id,
                    name: object.name.clone(),
                })
                .collect())
        }

        fn fetch_detail(&self, kind: ObjectType, id: u32) -> ApiResult<ManagedObject> {
            if let Some(err) = self.detail_failures.get(&(kind, id)) {
                return Err(err.clone());
            }
            self.objects
                .get(&(kind, id))
                .cloned()
                .ok_or(ApiError::NotFound)
        }

        fn delete_object(&self, _kind: ObjectType, _id: u32) -> ApiResult<()> {
            Err(ApiError::Unsupported("read-only test client".into()))
        }
    }

    fn script(id: u32, name: &str) -> ManagedObject {
        ManagedObject {
            kind: ObjectType::Script,
            id,
            name: name.to_string(),
            detail: Some(ObjectDetail::Script(ScriptDetail::default())),
        }
    }

    #[test]
    fn test_required_types_pull_in_containers() {
        let needed = required_types(&[ObjectType::Package]);
        assert_eq!(needed, vec![ObjectType::Package, ObjectType::Policy]);

        let needed = required_types(&[ObjectType::MobileDevice]);
        assert!(needed.contains(&ObjectType::MobileDeviceGroup));
        assert!(needed.contains(&ObjectType::MobileDeviceConfigurationProfile));
        assert!(needed.contains(&ObjectType::MobileApplication));
    }

    #[test]
    fn test_required_types_keeps_enumeration_order() {
        let needed = required_types(&[ObjectType::Script, ObjectType::Computer]);
        let mut sorted = needed.clone();
        sorted.sort();
        assert_eq!(needed, sorted);
    }

    #[test]
    fn test_transient_list_failure_is_retried() {
        let mut objects = BTreeMap::new();
        objects.insert((ObjectType::Script, 1), script(1, "a.sh"));
        let client = FlakyClient {
            objects,
            detail_failures: BTreeMap::new(),
            list_attempts: Mutex::new(0),
            list_transient_failures: 1,
        };

        let snapshot = fetch_snapshot(&client, &[ObjectType::Script]).unwrap();
        assert_eq!(snapshot.objects(ObjectType::Script).len(), 1);
    }

    #[test]
    fn test_detail_failure_keeps_summary_object() {
        let mut objects = BTreeMap::new();
        objects.insert((ObjectType::Script, 1), script(1, "a.sh"));
        objects.insert((ObjectType::Script, 2), script(2, "b.sh"));
        let mut detail_failures = BTreeMap::new();
        detail_failures.insert((ObjectType::Script, 2), ApiError::Permanent("boom".into()));

        let client = FlakyClient {
            objects,
            detail_failures,
            list_attempts: Mutex::new(0),
            list_transient_failures: 0,
        };

        let snapshot = fetch_snapshot(&client, &[ObjectType::Script]).unwrap();
        let scripts = snapshot.objects(ObjectType::Script);
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].detail.is_some());
        assert!(scripts[1].detail.is_none());
    }

    #[test]
    fn test_exhausted_list_retries_are_fatal() {
        let client = FlakyClient {
            objects: BTreeMap::new(),
            detail_failures: BTreeMap::new(),
            list_attempts: Mutex::new(0),
            list_transient_failures: 0,
        };
        // Simulate by demanding more retries than the bound allows.
        let failing = FlakyClient {
            list_transient_failures: 99,
            ..client
        };

        let result = fetch_snapshot(&failing, &[ObjectType::Script]);
        assert!(matches!(result, Err(SpruceError::Runtime(_))));
    }
}
