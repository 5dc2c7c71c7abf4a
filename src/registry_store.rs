use thiserror::Error;

use crate::hive::HiveView;
use crate::registry_value::RegistryValue;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("cannot delete hive root")]
    HiveRoot,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Live key/value tree addressed by view and path. Operations are independent of each
/// other: no handle or cursor survives between calls.
///
/// Paths are backslash-separated below the hive root, the root itself being `""`.
/// Value and key names compare case-insensitively.
pub trait RegistryStore {
    fn key_exists(&self, view: HiveView, path: &str) -> bool;

    /// Value names in enumeration order; the default value appears as `""`.
    fn value_names(&self, view: HiveView, path: &str) -> Result<Vec<String>, StoreError>;

    fn subkey_names(&self, view: HiveView, path: &str) -> Result<Vec<String>, StoreError>;

    /// `Ok(None)` when the key exists but the value does not.
    fn get_value(&self, view: HiveView, path: &str, name: &str) -> Result<Option<RegistryValue>, StoreError>;

    fn value_exists(&self, view: HiveView, path: &str, name: &str) -> bool {
        matches!(self.get_value(view, path, name), Ok(Some(_)))
    }

    /// Creates `path` and any missing ancestors. Succeeds when the key already exists.
    fn create_key(&mut self, view: HiveView, path: &str) -> Result<(), StoreError>;

    /// Writes `value` under its own name at `path`, replacing any previous value.
    fn set_value(&mut self, view: HiveView, path: &str, value: &RegistryValue) -> Result<(), StoreError>;

    /// Returns whether a value was removed.
    fn delete_value(&mut self, view: HiveView, path: &str, name: &str) -> Result<bool, StoreError>;

    /// Removes the key at `path` together with anything left below it.
    fn delete_key(&mut self, view: HiveView, path: &str) -> Result<(), StoreError>;
}
