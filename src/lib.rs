mod error;
mod exporter;
mod fragment;
mod hive;
mod importer;
pub mod logging;
mod options;
mod prompt;
mod redirection;
mod registry_dsl;
mod registry_key;
mod registry_store;
mod registry_utils;
mod registry_value;
mod replacement;
mod report;
pub mod value_codec;
#[cfg(windows)]
mod windows_registry;
mod wiper;

pub use error::{Result, UsageError, XmlRegError};
pub use exporter::{export, ExportRequest};
pub use fragment::{
    load_fragment, Fragment, FragmentError, FragmentNode, KeyElement, ValueElement, ITEM_ELEMENT,
    KEY_ELEMENT, ROOT_ELEMENT, VALUE_ELEMENT,
};
pub use hive::{DisplayPath, Hive, HiveView, UnknownHive};
pub use importer::{import, import_fragment};
pub use options::RunOptions;
pub use prompt::{Confirm, ScriptedConfirm, StdinConfirm};
pub use redirection::Redirection;
pub use registry_dsl::{modify_registry, registry, RegistryDslContext, RegistryKeyDsl};
pub use registry_key::{MemoryRegistry, RegistryKey};
pub use registry_store::{RegistryStore, StoreError};
pub use registry_utils::*;
pub use registry_value::{
    RegistryValue, RegistryValueData, REG_BINARY, REG_DWORD, REG_DWORD_BIG_ENDIAN, REG_EXPAND_SZ,
    REG_FULL_RESOURCE_DESCRIPTOR, REG_LINK, REG_MULTI_SZ, REG_NONE, REG_QWORD, REG_RESOURCE_LIST,
    REG_RESOURCE_REQUIREMENTS_LIST, REG_SZ,
};
pub use replacement::{
    ReferencePaths, ReplacementEngine, ReplacementRule, DIR_PLACEHOLDER, FILE_PLACEHOLDER,
    SHORT_DIR_PLACEHOLDER, SHORT_FILE_PLACEHOLDER,
};
pub use report::OperationReport;
pub use value_codec::CodecError;
#[cfg(windows)]
pub use windows_registry::WindowsRegistry;
pub use wiper::{wipe, wipe_fragment};
