//! Blocking HTTP implementation of [`ApiClient`] for the classic REST
//! interface (`/JSSResource/...`, JSON representation, basic auth).

use crate::api::{ApiClient, ApiError, ApiResult, ObjectRef};
use crate::config::Preferences;
use crate::error::{Result, SpruceError};
use crate::model::{
    DeviceDetail, GroupDetail, ManagedObject, MobileApplicationDetail, ObjectDetail, ObjectType,
    PackageDetail, PolicyDetail, ProfileDetail, Scope, ScriptDetail,
};
use chrono::DateTime;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct JamfClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl JamfClient {
    pub fn new(prefs: &Preferences) -> Result<Self> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if !prefs.ssl_verify {
            log::warn!("SSL verification disabled by preferences");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|e| SpruceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: prefs.url.trim_end_matches('/').to_string(),
            username: prefs.username.clone(),
            password: prefs.password.clone(),
        })
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}/JSSResource/{}", self.base_url, path)
    }

    fn get_json(&self, path: &str) -> ApiResult<Value> {
        let response = self
            .http
            .get(self.resource_url(path))
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if let Some(err) = error_for_status(status) {
            return Err(err);
        }
        response
            .json::<Value>()
            .map_err(|e| ApiError::Permanent(format!("invalid JSON payload: {}", e)))
    }

    /// Path segment of a kind's resource collection.
    fn endpoint(kind: ObjectType) -> &'static str {
        match kind {
            ObjectType::Computer => "computers",
            ObjectType::ComputerGroup => "computergroups",
            ObjectType::Package => "packages",
            ObjectType::Script => "scripts",
            ObjectType::Policy => "policies",
            ObjectType::ComputerConfigurationProfile => "osxconfigurationprofiles",
            ObjectType::MobileDevice => "mobiledevices",
            ObjectType::MobileDeviceGroup => "mobiledevicegroups",
            ObjectType::MobileDeviceConfigurationProfile => "mobiledeviceconfigurationprofiles",
            ObjectType::MobileApplication => "mobiledeviceapplications",
        }
    }

    /// Key wrapping the array in a list response.
    fn list_key(kind: ObjectType) -> &'static str {
        match kind {
            ObjectType::Computer => "computers",
            ObjectType::ComputerGroup => "computer_groups",
            ObjectType::Package => "packages",
            ObjectType::Script => "scripts",
            ObjectType::Policy => "policies",
            ObjectType::ComputerConfigurationProfile => "os_x_configuration_profiles",
            ObjectType::MobileDevice => "mobile_devices",
            ObjectType::MobileDeviceGroup => "mobile_device_groups",
            ObjectType::MobileDeviceConfigurationProfile => "configuration_profiles",
            ObjectType::MobileApplication => "mobile_device_applications",
        }
    }

    /// Key wrapping a detail response.
    fn detail_key(kind: ObjectType) -> &'static str {
        match kind {
            ObjectType::Computer => "computer",
            ObjectType::ComputerGroup => "computer_group",
            ObjectType::Package => "package",
            ObjectType::Script => "script",
            ObjectType::Policy => "policy",
            ObjectType::ComputerConfigurationProfile => "os_x_configuration_profile",
            ObjectType::MobileDevice => "mobile_device",
            ObjectType::MobileDeviceGroup => "mobile_device_group",
            ObjectType::MobileDeviceConfigurationProfile => "configuration_profile",
            ObjectType::MobileApplication => "mobile_device_application",
        }
    }
}

impl ApiClient for JamfClient {
    fn server(&self) -> &str {
        &self.base_url
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn probe(&self) -> ApiResult<()> {
        self.get_json("categories").map(|_| ())
    }

    fn list_objects(&self, kind: ObjectType) -> ApiResult<Vec<ObjectRef>> {
        let payload = self.get_json(Self::endpoint(kind))?;
        let rows = payload
            .get(Self::list_key(kind))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ApiError::Permanent(format!("list response for {} has no object array", kind))
            })?;

        let mut refs = Vec::with_capacity(rows.len());
        for row in rows {
            match (value_u32(row.get("id")), row.get("name").and_then(Value::as_str)) {
                (Some(id), Some(name)) => refs.push(ObjectRef {
                    id,
                    name: name.to_string(),
                }),
                _ => log::warn!("skipping {} list row without id/name: {}", kind, row),
            }
        }
        Ok(refs)
    }

    fn fetch_detail(&self, kind: ObjectType, id: u32) -> ApiResult<ManagedObject> {
        let path = format!("{}/id/{}", Self::endpoint(kind), id);
        let payload = self.get_json(&path)?;
        let body = payload.get(Self::detail_key(kind)).ok_or_else(|| {
            ApiError::Permanent(format!("detail response for {} {} has no body", kind, id))
        })?;

        let (parsed_id, name) = identity_of(kind, body);
        let detail = parse_detail(kind, body);
        if detail.is_none() {
            log::warn!("{} {} detail payload is missing expected fields", kind, id);
        }

        Ok(ManagedObject {
            kind,
            id: parsed_id.unwrap_or(id),
            name: name.unwrap_or_default(),
            detail,
        })
    }

    fn delete_object(&self, kind: ObjectType, id: u32) -> ApiResult<()> {
        let url = self.resource_url(&format!("{}/id/{}", Self::endpoint(kind), id));
        let response = self
            .http
            .delete(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .map_err(map_reqwest_error)?;

        match error_for_status(response.status()) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Transient(format!("request timed out: {}", err))
    } else if err.is_connect() {
        ApiError::Connection(err.to_string())
    } else {
        ApiError::Permanent(err.to_string())
    }
}

fn error_for_status(status: StatusCode) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Auth(format!("server returned {}", status))
        }
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::CONFLICT | StatusCode::NOT_IMPLEMENTED => {
            ApiError::Unsupported(format!("server returned {}", status))
        }
        s if s.is_server_error() => ApiError::Transient(format!("server returned {}", s)),
        s => ApiError::Permanent(format!("server returned {}", s)),
    })
}

/// id/name live under `general` for some kinds and at the top level for
/// others.
fn identity_of(kind: ObjectType, body: &Value) -> (Option<u32>, Option<String>) {
    let holder = match kind {
        ObjectType::Computer
        | ObjectType::MobileDevice
        | ObjectType::Policy
        | ObjectType::ComputerConfigurationProfile
        | ObjectType::MobileDeviceConfigurationProfile
        | ObjectType::MobileApplication => body.get("general").unwrap_or(body),
        _ => body,
    };
    (
        value_u32(holder.get("id")),
        holder.get("name").and_then(Value::as_str).map(String::from),
    )
}

fn parse_detail(kind: ObjectType, body: &Value) -> Option<ObjectDetail> {
    match kind {
        ObjectType::Computer => {
            let general = body.get("general")?;
            Some(ObjectDetail::Device(DeviceDetail {
                os_version: body
                    .get("hardware")
                    .and_then(|h| h.get("os_version"))
                    .and_then(Value::as_str)
                    .map(String::from),
                last_check_in: epoch_millis(general.get("last_contact_time_epoch")),
            }))
        }
        ObjectType::MobileDevice => {
            let general = body.get("general")?;
            Some(ObjectDetail::Device(DeviceDetail {
                os_version: general
                    .get("os_version")
                    .and_then(Value::as_str)
                    .map(String::from),
                last_check_in: epoch_millis(general.get("last_inventory_update_epoch")),
            }))
        }
        ObjectType::ComputerGroup => Some(ObjectDetail::Group(GroupDetail {
            is_smart: body.get("is_smart").and_then(Value::as_bool).unwrap_or(false),
            member_ids: id_list(body.get("computers")?),
        })),
        ObjectType::MobileDeviceGroup => Some(ObjectDetail::Group(GroupDetail {
            is_smart: body.get("is_smart").and_then(Value::as_bool).unwrap_or(false),
            member_ids: id_list(body.get("mobile_devices")?),
        })),
        ObjectType::Package => Some(ObjectDetail::Package(PackageDetail {
            filename: body.get("filename").and_then(Value::as_str).map(String::from),
            category: body.get("category").and_then(Value::as_str).map(String::from),
        })),
        ObjectType::Script => Some(ObjectDetail::Script(ScriptDetail {
            category: body.get("category").and_then(Value::as_str).map(String::from),
        })),
        ObjectType::Policy => {
            let scope = body.get("scope")?;
            Some(ObjectDetail::Policy(PolicyDetail {
                enabled: body
                    .get("general")
                    .and_then(|g| g.get("enabled"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                package_ids: body
                    .get("package_configuration")
                    .and_then(|p| p.get("packages"))
                    .map(id_list)
                    .unwrap_or_default(),
                script_ids: body.get("scripts").map(id_list).unwrap_or_default(),
                scope: parse_scope(scope, "all_computers", "computers", "computer_groups"),
            }))
        }
        ObjectType::ComputerConfigurationProfile => {
            let scope = body.get("scope")?;
            Some(ObjectDetail::Profile(ProfileDetail {
                scope: parse_scope(scope, "all_computers", "computers", "computer_groups"),
            }))
        }
        ObjectType::MobileDeviceConfigurationProfile => {
            let scope = body.get("scope")?;
            Some(ObjectDetail::Profile(ProfileDetail {
                scope: parse_scope(
                    scope,
                    "all_mobile_devices",
                    "mobile_devices",
                    "mobile_device_groups",
                ),
            }))
        }
        ObjectType::MobileApplication => {
            let scope = body.get("scope")?;
            Some(ObjectDetail::MobileApplication(MobileApplicationDetail {
                version: body
                    .get("general")
                    .and_then(|g| g.get("version"))
                    .and_then(Value::as_str)
                    .map(String::from),
                scope: parse_scope(
                    scope,
                    "all_mobile_devices",
                    "mobile_devices",
                    "mobile_device_groups",
                ),
            }))
        }
    }
}

fn parse_scope(scope: &Value, all_key: &str, targets_key: &str, groups_key: &str) -> Scope {
    Scope {
        all_targets: scope.get(all_key).and_then(Value::as_bool).unwrap_or(false),
        group_ids: scope.get(groups_key).map(id_list).unwrap_or_default(),
        target_ids: scope.get(targets_key).map(id_list).unwrap_or_default(),
    }
}

/// Ids out of an array of `{ "id": ... }` objects.
fn id_list(value: &Value) -> Vec<u32> {
    value
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| value_u32(row.get("id"))).collect())
        .unwrap_or_default()
}

/// The server is inconsistent about numeric fields arriving as numbers or
/// strings.
fn value_u32(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn epoch_millis(value: Option<&Value>) -> Option<chrono::DateTime<chrono::Utc>> {
    let ms = value?.as_i64()?;
    if ms <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(ms)
}
