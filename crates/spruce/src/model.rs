//! Inventory data model.
//!
//! Every object on the server is a [`ManagedObject`]: one of ten closed
//! kinds, a numeric id unique within its kind, a display name, and an
//! optional detail payload carrying whatever classification needs. Identity
//! is always `(kind, id)`. Names are not unique on the server and are never
//! used as a removal key.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// The ten object kinds the tool knows about, in interchange-tag order.
///
/// This declaration order is the stable order used everywhere: report
/// sections, removal confirmation, and the `Removals` element of the
/// interchange document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Computer,
    ComputerGroup,
    Package,
    Script,
    Policy,
    ComputerConfigurationProfile,
    MobileDevice,
    MobileDeviceGroup,
    MobileDeviceConfigurationProfile,
    MobileApplication,
}

impl ObjectType {
    pub const ALL: [ObjectType; 10] = [
        ObjectType::Computer,
        ObjectType::ComputerGroup,
        ObjectType::Package,
        ObjectType::Script,
        ObjectType::Policy,
        ObjectType::ComputerConfigurationProfile,
        ObjectType::MobileDevice,
        ObjectType::MobileDeviceGroup,
        ObjectType::MobileDeviceConfigurationProfile,
        ObjectType::MobileApplication,
    ];

    /// Element tag in the interchange document. Matching is case-sensitive.
    pub fn xml_tag(self) -> &'static str {
        match self {
            ObjectType::Computer => "Computer",
            ObjectType::ComputerGroup => "ComputerGroup",
            ObjectType::Package => "Package",
            ObjectType::Script => "Script",
            ObjectType::Policy => "Policy",
            ObjectType::ComputerConfigurationProfile => "ComputerConfigurationProfile",
            ObjectType::MobileDevice => "MobileDevice",
            ObjectType::MobileDeviceGroup => "MobileDeviceGroup",
            ObjectType::MobileDeviceConfigurationProfile => "MobileDeviceConfigurationProfile",
            ObjectType::MobileApplication => "MobileApplication",
        }
    }

    /// Exact, case-sensitive reverse of [`ObjectType::xml_tag`].
    pub fn from_xml_tag(tag: &str) -> Option<Self> {
        ObjectType::ALL.iter().copied().find(|k| k.xml_tag() == tag)
    }

    /// Section container tag in the interchange document.
    pub fn section_tag(self) -> &'static str {
        match self {
            ObjectType::Computer => "Computers",
            ObjectType::ComputerGroup => "ComputerGroups",
            ObjectType::Package => "Packages",
            ObjectType::Script => "Scripts",
            ObjectType::Policy => "Policies",
            ObjectType::ComputerConfigurationProfile => "ComputerConfigurationProfiles",
            ObjectType::MobileDevice => "MobileDevices",
            ObjectType::MobileDeviceGroup => "MobileDeviceGroups",
            ObjectType::MobileDeviceConfigurationProfile => {
                "MobileDeviceConfigurationProfiles"
            }
            ObjectType::MobileApplication => "MobileApplications",
        }
    }

    /// Lowercase human form for prompts and log lines.
    pub fn human_name(self) -> &'static str {
        match self {
            ObjectType::Computer => "computer",
            ObjectType::ComputerGroup => "computer group",
            ObjectType::Package => "package",
            ObjectType::Script => "script",
            ObjectType::Policy => "policy",
            ObjectType::ComputerConfigurationProfile => "computer configuration profile",
            ObjectType::MobileDevice => "mobile device",
            ObjectType::MobileDeviceGroup => "mobile device group",
            ObjectType::MobileDeviceConfigurationProfile => {
                "mobile device configuration profile"
            }
            ObjectType::MobileApplication => "mobile application",
        }
    }

    /// Lowercase plural human form.
    pub fn human_plural(self) -> &'static str {
        match self {
            ObjectType::Computer => "computers",
            ObjectType::ComputerGroup => "computer groups",
            ObjectType::Package => "packages",
            ObjectType::Script => "scripts",
            ObjectType::Policy => "policies",
            ObjectType::ComputerConfigurationProfile => "computer configuration profiles",
            ObjectType::MobileDevice => "mobile devices",
            ObjectType::MobileDeviceGroup => "mobile device groups",
            ObjectType::MobileDeviceConfigurationProfile => {
                "mobile device configuration profiles"
            }
            ObjectType::MobileApplication => "mobile applications",
        }
    }

    /// Kinds whose detail payload can reference other objects.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ObjectType::ComputerGroup
                | ObjectType::Policy
                | ObjectType::ComputerConfigurationProfile
                | ObjectType::MobileDeviceGroup
                | ObjectType::MobileDeviceConfigurationProfile
                | ObjectType::MobileApplication
        )
    }

    /// Kinds that are deployed to endpoints through a scope of their own.
    pub fn is_scoped_container(self) -> bool {
        matches!(
            self,
            ObjectType::Policy
                | ObjectType::ComputerConfigurationProfile
                | ObjectType::MobileDeviceConfigurationProfile
                | ObjectType::MobileApplication
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xml_tag())
    }
}

/// The `(kind, id)` pair that uniquely identifies an object on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectIdentity {
    pub kind: ObjectType,
    pub id: u32,
}

impl ObjectIdentity {
    pub fn new(kind: ObjectType, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A single fetched object.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub kind: ObjectType,
    pub id: u32,
    pub name: String,
    pub detail: Option<ObjectDetail>,
}

impl ManagedObject {
    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity::new(self.kind, self.id)
    }
}

/// Detail payload, one variant per family of kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectDetail {
    Device(DeviceDetail),
    Group(GroupDetail),
    Package(PackageDetail),
    Script(ScriptDetail),
    Policy(PolicyDetail),
    Profile(ProfileDetail),
    MobileApplication(MobileApplicationDetail),
}

/// Computers and mobile devices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceDetail {
    pub os_version: Option<String>,
    pub last_check_in: Option<DateTime<Utc>>,
}

/// Computer groups and mobile device groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupDetail {
    pub is_smart: bool,
    pub member_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageDetail {
    pub filename: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptDetail {
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyDetail {
    pub enabled: bool,
    pub package_ids: Vec<u32>,
    pub script_ids: Vec<u32>,
    pub scope: Scope,
}

/// Computer and mobile device configuration profiles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileDetail {
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MobileApplicationDetail {
    pub version: Option<String>,
    pub scope: Scope,
}

/// Deployment scope of a policy, profile, or mobile application.
///
/// `group_ids` and `target_ids` are group and individual endpoint ids of the
/// matching platform (computers for computer-side containers, mobile devices
/// for mobile-side ones).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    pub all_targets: bool,
    pub group_ids: Vec<u32>,
    pub target_ids: Vec<u32>,
}

impl Scope {
    pub fn is_empty(&self) -> bool {
        !self.all_targets && self.group_ids.is_empty() && self.target_ids.is_empty()
    }
}

/// Everything fetched in one invocation, grouped by kind.
///
/// Rebuilt fresh on every run and treated as immutable once fetched.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    objects: BTreeMap<ObjectType, Vec<ManagedObject>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the fetched collection for a kind, sorted by id.
    pub fn insert(&mut self, kind: ObjectType, mut objects: Vec<ManagedObject>) {
        objects.sort_by_key(|o| o.id);
        self.objects.insert(kind, objects);
    }

    /// Objects of a kind; empty slice when the kind was not fetched.
    pub fn objects(&self, kind: ObjectType) -> &[ManagedObject] {
        self.objects.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: ObjectType) -> bool {
        self.objects.contains_key(&kind)
    }
}
