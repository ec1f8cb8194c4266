#![allow(dead_code)]

use spruce_lib::api::{ApiClient, ApiError, ApiResult, ObjectRef};
use spruce_lib::model::{
    DeviceDetail, GroupDetail, ManagedObject, ObjectDetail, ObjectType, PolicyDetail, Scope,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory server double with programmable per-item delete results.
pub struct MockJss {
    objects: BTreeMap<(ObjectType, u32), ManagedObject>,
    delete_failures: BTreeMap<(ObjectType, u32), ApiError>,
    pub deleted: Mutex<Vec<(ObjectType, u32)>>,
}

impl MockJss {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            delete_failures: BTreeMap::new(),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&mut self, object: ManagedObject) -> &mut Self {
        self.objects.insert((object.kind, object.id), object);
        self
    }

    pub fn fail_delete(&mut self, kind: ObjectType, id: u32, err: ApiError) -> &mut Self {
        self.delete_failures.insert((kind, id), err);
        self
    }

    pub fn deleted_ids(&self) -> Vec<(ObjectType, u32)> {
        self.deleted.lock().unwrap().clone()
    }
}

impl ApiClient for MockJss {
    fn server(&self) -> &str {
        "https://jss.test:8443"
    }

    fn username(&self) -> &str {
        "api-test"
    }

    fn probe(&self) -> ApiResult<()> {
        Ok(())
    }

    fn list_objects(&self, kind: ObjectType) -> ApiResult<Vec<ObjectRef>> {
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
        self.objects
            .get(&(kind, id))
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    fn delete_object(&self, kind: ObjectType, id: u32) -> ApiResult<()> {
        self.deleted.lock().unwrap().push((kind, id));
        match self.delete_failures.get(&(kind, id)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub fn package(id: u32, name: &str) -> ManagedObject {
    ManagedObject {
        kind: ObjectType::Package,
        id,
        name: name.to_string(),
        detail: None,
    }
}

pub fn script(id: u32, name: &str) -> ManagedObject {
    ManagedObject {
        kind: ObjectType::Script,
        id,
        name: name.to_string(),
        detail: None,
    }
}

pub fn policy(id: u32, name: &str, package_ids: Vec<u32>, script_ids: Vec<u32>) -> ManagedObject {
    ManagedObject {
        kind: ObjectType::Policy,
        id,
        name: name.to_string(),
        detail: Some(ObjectDetail::Policy(PolicyDetail {
            enabled: true,
            package_ids,
            script_ids,
            scope: Scope {
                all_targets: true,
                group_ids: vec![],
                target_ids: vec![],
            },
        })),
    }
}

pub fn computer_group(id: u32, name: &str, member_ids: Vec<u32>) -> ManagedObject {
    ManagedObject {
        kind: ObjectType::ComputerGroup,
        id,
        name: name.to_string(),
        detail: Some(ObjectDetail::Group(GroupDetail {
            is_smart: false,
            member_ids,
        })),
    }
}

pub fn computer(id: u32, name: &str, last_check_in: Option<chrono::DateTime<chrono::Utc>>) -> ManagedObject {
    ManagedObject {
        kind: ObjectType::Computer,
        id,
        name: name.to_string(),
        detail: Some(ObjectDetail::Device(DeviceDetail {
            os_version: Some("14.5".to_string()),
            last_check_in,
        })),
    }
}
