use std::collections::{BTreeMap, HashMap, HashSet};

use crate::hive::HiveView;
use crate::registry_store::{RegistryStore, StoreError};
use crate::registry_utils::{normalize_path, path_segments, split_parent};
use crate::registry_value::RegistryValue;

/// In-memory key. Children are owned; there is no link back to the parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryKey {
    pub name: String,
    subkeys: BTreeMap<String, RegistryKey>,
    values: BTreeMap<String, RegistryValue>,
}

impl RegistryKey {
    pub fn create_root() -> Self {
        Self::default()
    }

    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn subkeys(&self) -> impl Iterator<Item = &RegistryKey> {
        self.subkeys.values()
    }

    pub fn values(&self) -> impl Iterator<Item = &RegistryValue> {
        self.values.values()
    }

    pub fn subkey_count(&self) -> usize {
        self.subkeys.len()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn get_subkey(&self, name: &str) -> Option<&RegistryKey> {
        self.subkeys.get(&normalize(name))
    }

    pub fn get_value(&self, name: &str) -> Option<&RegistryValue> {
        self.values.get(&normalize(name))
    }

    pub fn set_value(&mut self, value: RegistryValue) {
        self.values.insert(normalize(&value.name), value);
    }

    pub fn delete_value(&mut self, name: &str) -> bool {
        self.values.remove(&normalize(name)).is_some()
    }

    /// Returns the existing child when one with the same name (ignoring case) exists.
    pub fn create_subkey(&mut self, name: &str) -> &mut RegistryKey {
        self.subkeys
            .entry(normalize(name))
            .or_insert_with(|| RegistryKey::new(name))
    }

    pub fn create_key_recursive(&mut self, path: &str) -> &mut RegistryKey {
        let mut current = self;
        for segment in path_segments(path) {
            current = current.create_subkey(segment);
        }
        current
    }

    pub fn find_key(&self, path: &str) -> Option<&RegistryKey> {
        let mut current = self;
        for segment in path_segments(path) {
            current = current.get_subkey(segment)?;
        }
        Some(current)
    }

    pub fn find_key_mut(&mut self, path: &str) -> Option<&mut RegistryKey> {
        let mut current = self;
        for segment in path_segments(path) {
            current = current.subkeys.get_mut(&normalize(segment))?;
        }
        Some(current)
    }

    pub fn delete_subkey(&mut self, name: &str) -> bool {
        self.subkeys.remove(&normalize(name)).is_some()
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Registry held in memory, one independent tree per hive view.
///
/// Reads can be denied per key, and writes per value or per key, to simulate locked
/// entries.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    roots: HashMap<HiveView, RegistryKey>,
    denied_reads: HashSet<(HiveView, String)>,
    denied_value_reads: HashSet<(HiveView, String, String)>,
    denied_value_writes: HashSet<(HiveView, String, String)>,
    denied_key_creates: HashSet<(HiveView, String)>,
    denied_key_deletes: HashSet<(HiveView, String)>,
    mutations: usize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self, view: HiveView) -> Option<&RegistryKey> {
        self.roots.get(&view)
    }

    pub fn root_mut(&mut self, view: HiveView) -> &mut RegistryKey {
        self.roots.entry(view).or_default()
    }

    pub fn find_key(&self, view: HiveView, path: &str) -> Option<&RegistryKey> {
        self.roots.get(&view)?.find_key(path)
    }

    /// Makes enumerating and reading the values and subkeys of `path` fail.
    pub fn deny_read(&mut self, view: HiveView, path: &str) {
        self.denied_reads.insert((view, location(path)));
    }

    /// Makes reading the single value `name` fail while the key stays enumerable.
    pub fn deny_value_read(&mut self, view: HiveView, path: &str, name: &str) {
        self.denied_value_reads
            .insert((view, location(path), normalize(name)));
    }

    pub fn deny_value_write(&mut self, view: HiveView, path: &str, name: &str) {
        self.denied_value_writes
            .insert((view, location(path), normalize(name)));
    }

    pub fn deny_key_create(&mut self, view: HiveView, path: &str) {
        self.denied_key_creates.insert((view, location(path)));
    }

    pub fn deny_key_delete(&mut self, view: HiveView, path: &str) {
        self.denied_key_deletes.insert((view, location(path)));
    }

    /// Number of successful mutating calls so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    fn check_read(&self, view: HiveView, path: &str) -> Result<(), StoreError> {
        if self.denied_reads.contains(&(view, location(path))) {
            return Err(StoreError::AccessDenied(path.to_string()));
        }
        Ok(())
    }

    fn key_or_err(&self, view: HiveView, path: &str) -> Result<&RegistryKey, StoreError> {
        self.find_key(view, path)
            .ok_or_else(|| StoreError::KeyNotFound(path.to_string()))
    }
}

fn location(path: &str) -> String {
    normalize(&normalize_path(path))
}

impl RegistryStore for MemoryRegistry {
    // Hive roots always exist.
    fn key_exists(&self, view: HiveView, path: &str) -> bool {
        path_segments(path).next().is_none() || self.find_key(view, path).is_some()
    }

    fn value_names(&self, view: HiveView, path: &str) -> Result<Vec<String>, StoreError> {
        self.check_read(view, path)?;
        if path_segments(path).next().is_none() && !self.roots.contains_key(&view) {
            return Ok(Vec::new());
        }
        Ok(self
            .key_or_err(view, path)?
            .values()
            .map(|v| v.name.clone())
            .collect())
    }

    fn subkey_names(&self, view: HiveView, path: &str) -> Result<Vec<String>, StoreError> {
        self.check_read(view, path)?;
        if path_segments(path).next().is_none() && !self.roots.contains_key(&view) {
            return Ok(Vec::new());
        }
        Ok(self
            .key_or_err(view, path)?
            .subkeys()
            .map(|k| k.name.clone())
            .collect())
    }

    fn get_value(&self, view: HiveView, path: &str, name: &str) -> Result<Option<RegistryValue>, StoreError> {
        self.check_read(view, path)?;
        if self
            .denied_value_reads
            .contains(&(view, location(path), normalize(name)))
        {
            return Err(StoreError::AccessDenied(format!("{}\\{}", path, name)));
        }
        if !self.key_exists(view, path) {
            return Err(StoreError::KeyNotFound(path.to_string()));
        }
        Ok(self
            .find_key(view, path)
            .and_then(|key| key.get_value(name))
            .cloned())
    }

    fn create_key(&mut self, view: HiveView, path: &str) -> Result<(), StoreError> {
        let mut prefix = String::new();
        for segment in path_segments(path) {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(segment);
            if self.denied_key_creates.contains(&(view, location(&prefix)))
                && self.find_key(view, &prefix).is_none()
            {
                return Err(StoreError::AccessDenied(prefix));
            }
        }
        self.root_mut(view).create_key_recursive(path);
        self.mutations += 1;
        Ok(())
    }

    fn set_value(&mut self, view: HiveView, path: &str, value: &RegistryValue) -> Result<(), StoreError> {
        if self
            .denied_value_writes
            .contains(&(view, location(path), normalize(&value.name)))
        {
            return Err(StoreError::AccessDenied(format!("{}\\{}", path, value.name)));
        }
        let key = if path_segments(path).next().is_none() {
            Some(self.roots.entry(view).or_default())
        } else {
            self.roots
                .get_mut(&view)
                .and_then(|root| root.find_key_mut(path))
        };
        let key = key.ok_or_else(|| StoreError::KeyNotFound(path.to_string()))?;
        key.set_value(value.clone());
        self.mutations += 1;
        Ok(())
    }

    fn delete_value(&mut self, view: HiveView, path: &str, name: &str) -> Result<bool, StoreError> {
        if path_segments(path).next().is_none() && !self.roots.contains_key(&view) {
            return Ok(false);
        }
        let key = self
            .roots
            .get_mut(&view)
            .and_then(|root| root.find_key_mut(path))
            .ok_or_else(|| StoreError::KeyNotFound(path.to_string()))?;
        let removed = key.delete_value(name);
        if removed {
            self.mutations += 1;
        }
        Ok(removed)
    }

    fn delete_key(&mut self, view: HiveView, path: &str) -> Result<(), StoreError> {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            return Err(StoreError::HiveRoot);
        }
        if self.denied_key_deletes.contains(&(view, location(&normalized))) {
            return Err(StoreError::AccessDenied(normalized));
        }
        let (parent, name) = split_parent(&normalized);
        let removed = self
            .roots
            .get_mut(&view)
            .and_then(|root| root.find_key_mut(parent))
            .map(|parent| parent.delete_subkey(name))
            .unwrap_or(false);
        if !removed {
            return Err(StoreError::KeyNotFound(normalized));
        }
        self.mutations += 1;
        Ok(())
    }
}
