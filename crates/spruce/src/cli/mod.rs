pub mod remove;
pub mod report;

use clap::Parser;
use spruce_lib::ObjectType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spruce")]
#[command(about = "Clean up unused, redundant, and stale objects on your fleet server", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to a preferences file")]
    pub prefs: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "Include lists of all objects and used objects in reports"
    )]
    pub verbose: bool,

    #[arg(short, long, conflicts_with = "verbose", help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(
        short,
        long,
        help = "Generate all reports (the default when no report flag is given)"
    )]
    pub all: bool,

    #[arg(short, long, help = "Generate the package report")]
    pub packages: bool,

    #[arg(short, long, help = "Generate the script report")]
    pub scripts: bool,

    #[arg(short = 't', long, help = "Generate the policy report")]
    pub policies: bool,

    #[arg(
        short = 'g',
        long,
        help = "Generate the computer-group report (static and smart)"
    )]
    pub computer_groups: bool,

    #[arg(
        short = 'r',
        long,
        help = "Generate the mobile-device-group report (static and smart)"
    )]
    pub mobile_device_groups: bool,

    #[arg(
        short = 'c',
        long,
        help = "Generate the computer configuration-profile report"
    )]
    pub computer_configuration_profiles: bool,

    #[arg(
        short = 'm',
        long,
        help = "Generate the mobile-device configuration-profile report"
    )]
    pub mobile_device_configuration_profiles: bool,

    #[arg(short = 'u', long, help = "Generate the computer report")]
    pub computers: bool,

    #[arg(short = 'd', long, help = "Generate the mobile-device report")]
    pub mobile_devices: bool,

    #[arg(short = 'b', long, help = "Generate the mobile-application report")]
    pub mobile_applications: bool,

    #[arg(
        short = 'o',
        long = "ofile",
        value_name = "FILE",
        help = "Write the report to FILE as an interchange document instead of STDOUT"
    )]
    pub ofile: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Remove the objects listed in FILE; all reporting is skipped",
        conflicts_with_all = [
            "all", "packages", "scripts", "policies", "computer_groups",
            "mobile_device_groups", "computer_configuration_profiles",
            "mobile_device_configuration_profiles", "computers",
            "mobile_devices", "mobile_applications", "ofile",
        ]
    )]
    pub remove: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        help = "Keep the newest N versions of each package name"
    )]
    pub keep_versions: Option<usize>,

    #[arg(
        long,
        value_name = "DAYS",
        help = "Days without a check-in before a device counts as stale"
    )]
    pub stale_days: Option<i64>,
}

impl Cli {
    /// Report kinds selected by flags; everything when `-a` or no flag.
    pub fn requested_types(&self) -> Vec<ObjectType> {
        let flags = [
            (self.computers, ObjectType::Computer),
            (self.computer_groups, ObjectType::ComputerGroup),
            (self.packages, ObjectType::Package),
            (self.scripts, ObjectType::Script),
            (self.policies, ObjectType::Policy),
            (
                self.computer_configuration_profiles,
                ObjectType::ComputerConfigurationProfile,
            ),
            (self.mobile_devices, ObjectType::MobileDevice),
            (self.mobile_device_groups, ObjectType::MobileDeviceGroup),
            (
                self.mobile_device_configuration_profiles,
                ObjectType::MobileDeviceConfigurationProfile,
            ),
            (self.mobile_applications, ObjectType::MobileApplication),
        ];

        let selected: Vec<ObjectType> = flags
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, kind)| *kind)
            .collect();

        if self.all || selected.is_empty() {
            ObjectType::ALL.to_vec()
        } else {
            selected
        }
    }
}
