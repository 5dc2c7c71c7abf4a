use crate::hive::HiveView;
use crate::registry_key::{MemoryRegistry, RegistryKey};
use crate::registry_value::{RegistryValue, RegistryValueData, REG_BINARY};

pub struct RegistryDslContext {
    registry: MemoryRegistry,
}

impl RegistryDslContext {
    pub fn new() -> Self {
        Self {
            registry: MemoryRegistry::new(),
        }
    }

    pub fn root<F>(&mut self, view: HiveView, f: F)
    where
        F: FnOnce(&mut RegistryKeyDsl<'_>),
    {
        let mut dsl = RegistryKeyDsl {
            key: self.registry.root_mut(view),
        };
        f(&mut dsl);
    }

    pub fn key<F>(&mut self, view: HiveView, path: &str, f: F)
    where
        F: FnOnce(&mut RegistryKeyDsl<'_>),
    {
        let key = self.registry.root_mut(view).create_key_recursive(path);
        let mut dsl = RegistryKeyDsl { key };
        f(&mut dsl);
    }

    pub fn build(self) -> MemoryRegistry {
        self.registry
    }
}

impl Default for RegistryDslContext {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RegistryKeyDsl<'a> {
    pub key: &'a mut RegistryKey,
}

impl RegistryKeyDsl<'_> {
    pub fn key<F>(&mut self, path: &str, f: F)
    where
        F: FnOnce(&mut RegistryKeyDsl<'_>),
    {
        let key = self.key.create_key_recursive(path);
        let mut dsl = RegistryKeyDsl { key };
        f(&mut dsl);
    }

    pub fn value(&mut self, name: &str, value: &str) {
        self.set(name, RegistryValueData::String(value.to_string()));
    }

    pub fn expand_string(&mut self, name: &str, value: &str) {
        self.set(name, RegistryValueData::ExpandString(value.to_string()));
    }

    pub fn multi_string(&mut self, name: &str, values: Vec<String>) {
        self.set(name, RegistryValueData::MultiString(values));
    }

    pub fn dword(&mut self, name: &str, value: i32) {
        self.set(name, RegistryValueData::Dword(value as u32));
    }

    pub fn dword_be(&mut self, name: &str, value: i32) {
        self.set(name, RegistryValueData::DwordBigEndian(value as u32));
    }

    pub fn qword(&mut self, name: &str, value: i64) {
        self.set(name, RegistryValueData::Qword(value as u64));
    }

    pub fn binary(&mut self, name: &str, data: &[u8]) {
        self.set(name, RegistryValueData::Binary(data.to_vec(), REG_BINARY));
    }

    pub fn raw(&mut self, name: &str, reg_type: u32, data: &[u8]) {
        self.set(name, RegistryValueData::Binary(data.to_vec(), reg_type));
    }

    pub fn delete_value(&mut self, name: &str) -> bool {
        self.key.delete_value(name)
    }

    fn set(&mut self, name: &str, data: RegistryValueData) {
        self.key.set_value(RegistryValue::new(name, data));
    }
}

pub fn registry<F>(f: F) -> MemoryRegistry
where
    F: FnOnce(&mut RegistryDslContext),
{
    let mut ctx = RegistryDslContext::new();
    f(&mut ctx);
    ctx.build()
}

pub fn modify_registry<F>(mut registry: MemoryRegistry, view: HiveView, f: F) -> MemoryRegistry
where
    F: FnOnce(&mut RegistryKeyDsl<'_>),
{
    let mut dsl = RegistryKeyDsl {
        key: registry.root_mut(view),
    };
    f(&mut dsl);
    registry
}
