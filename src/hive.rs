use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::redirection::Redirection;

/// One of the four root namespaces the tool works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Hive {
    LocalMachine,
    #[default]
    CurrentUser,
    Users,
    ClassesRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hive '{0}' (expected HKLM, HKCU, HKU or HKCR)")]
pub struct UnknownHive(pub String);

impl Hive {
    pub const ALL: [Hive; 4] = [
        Hive::LocalMachine,
        Hive::CurrentUser,
        Hive::Users,
        Hive::ClassesRoot,
    ];

    pub fn short_name(&self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
            Hive::Users => "HKU",
            Hive::ClassesRoot => "HKCR",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::Users => "HKEY_USERS",
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
        }
    }
}

impl FromStr for Hive {
    type Err = UnknownHive;

    /// Accepts short and long names, case-insensitively, with an optional trailing `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_suffix(':').unwrap_or(&upper);
        Hive::ALL
            .into_iter()
            .find(|h| h.short_name() == name || h.long_name() == name)
            .ok_or_else(|| UnknownHive(s.to_string()))
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A hive as seen through one redirection view. Every store operation is addressed
/// by a view plus a backslash-separated path below the hive root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HiveView {
    pub hive: Hive,
    pub redirection: Redirection,
}

impl HiveView {
    pub fn new(hive: Hive, redirection: Redirection) -> Self {
        Self { hive, redirection }
    }

    pub fn display_path<'a>(&'a self, path: &'a str) -> DisplayPath<'a> {
        DisplayPath { view: self, path }
    }
}

/// Renders as `(redirection) HIVE:\path`.
pub struct DisplayPath<'a> {
    view: &'a HiveView,
    path: &'a str,
}

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}:\\{}", self.view.redirection, self.view.hive, self.path)
    }
}
