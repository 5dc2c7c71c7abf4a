use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::ptr::null_mut;

use windows_sys::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, WIN32_ERROR,
};
use windows_sys::Win32::System::Registry::{RegEnumValueW, RegQueryValueExW, RegSetValueExW};
use winreg::enums::{
    HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_ALL_ACCESS, KEY_READ,
    KEY_WOW64_32KEY, KEY_WOW64_64KEY,
};
use winreg::RegKey;

use crate::hive::{Hive, HiveView};
use crate::redirection::Redirection;
use crate::registry_store::{RegistryStore, StoreError};
use crate::registry_utils::split_parent;
use crate::registry_value::RegistryValue;

// Longest value name the registry allows, plus the terminator.
const MAX_VALUE_NAME: usize = 16_384;

/// The live registry. Every call opens its own handle and closes it on return.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, view: HiveView, path: &str, access: u32) -> io::Result<RegKey> {
        predef(view.hive).open_subkey_with_flags(path, access | view_flag(view.redirection))
    }
}

fn predef(hive: Hive) -> RegKey {
    RegKey::predef(match hive {
        Hive::LocalMachine => HKEY_LOCAL_MACHINE,
        Hive::CurrentUser => HKEY_CURRENT_USER,
        Hive::Users => HKEY_USERS,
        Hive::ClassesRoot => HKEY_CLASSES_ROOT,
    })
}

fn view_flag(redirection: Redirection) -> u32 {
    match redirection {
        Redirection::None => 0,
        Redirection::Wow32 => KEY_WOW64_32KEY,
        Redirection::Wow64 => KEY_WOW64_64KEY,
    }
}

fn store_error(err: io::Error, path: &str) -> StoreError {
    match err.kind() {
        io::ErrorKind::NotFound => StoreError::KeyNotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => StoreError::AccessDenied(path.to_string()),
        _ => StoreError::Io(err),
    }
}

fn status_error(status: WIN32_ERROR, path: &str) -> StoreError {
    store_error(io::Error::from_raw_os_error(status as i32), path)
}

fn wide(text: &str) -> Vec<u16> {
    OsStr::new(text).encode_wide().chain(Some(0)).collect()
}

// Value names are enumerated without their data, so no type code can make this fail.
fn enum_value_names(key: &RegKey) -> Result<Vec<String>, WIN32_ERROR> {
    let mut names = Vec::new();
    let mut buffer = vec![0u16; MAX_VALUE_NAME];
    for index in 0u32.. {
        let mut len = buffer.len() as u32;
        // SAFETY: `len` is the capacity of `buffer`; type and data pointers are null.
        let status = unsafe {
            RegEnumValueW(
                key.raw_handle(),
                index,
                buffer.as_mut_ptr(),
                &mut len,
                null_mut(),
                null_mut(),
                null_mut(),
                null_mut(),
            )
        };
        match status {
            ERROR_SUCCESS => names.push(String::from_utf16_lossy(&buffer[..len as usize])),
            ERROR_NO_MORE_ITEMS => break,
            other => return Err(other),
        }
    }
    Ok(names)
}

/// Type code and payload of `name`, whatever the code is. `Ok(None)` when absent.
fn query_raw_value(key: &RegKey, name: &str) -> Result<Option<(u32, Vec<u8>)>, WIN32_ERROR> {
    let name = wide(name);
    let mut data: Vec<u8> = Vec::new();
    loop {
        let mut code = 0u32;
        let mut size = data.len() as u32;
        let target = if data.is_empty() { null_mut() } else { data.as_mut_ptr() };
        // SAFETY: `name` is NUL-terminated and `size` is the capacity behind `target`.
        let status = unsafe {
            RegQueryValueExW(key.raw_handle(), name.as_ptr(), null_mut(), &mut code, target, &mut size)
        };
        match status {
            ERROR_SUCCESS if target.is_null() && size > 0 => data.resize(size as usize, 0),
            ERROR_SUCCESS => {
                data.truncate(size as usize);
                return Ok(Some((code, data)));
            }
            ERROR_MORE_DATA => data.resize((size as usize).max(data.len() * 2), 0),
            ERROR_FILE_NOT_FOUND => return Ok(None),
            other => return Err(other),
        }
    }
}

fn set_raw_value(key: &RegKey, value: &RegistryValue) -> Result<(), StoreError> {
    let name = wide(&value.name);
    let bytes = value.raw_bytes();
    let size = u32::try_from(bytes.len()).map_err(|_| {
        StoreError::Io(io::Error::new(io::ErrorKind::InvalidInput, "value payload too large"))
    })?;
    // SAFETY: `name` is NUL-terminated and `bytes` holds `size` bytes.
    let status = unsafe {
        RegSetValueExW(key.raw_handle(), name.as_ptr(), 0, value.reg_type(), bytes.as_ptr(), size)
    };
    match status {
        ERROR_SUCCESS => Ok(()),
        other => Err(status_error(other, &value.name)),
    }
}

impl RegistryStore for WindowsRegistry {
    fn key_exists(&self, view: HiveView, path: &str) -> bool {
        self.open(view, path, KEY_READ).is_ok()
    }

    fn value_names(&self, view: HiveView, path: &str) -> Result<Vec<String>, StoreError> {
        let key = self.open(view, path, KEY_READ).map_err(|e| store_error(e, path))?;
        enum_value_names(&key).map_err(|status| status_error(status, path))
    }

    fn subkey_names(&self, view: HiveView, path: &str) -> Result<Vec<String>, StoreError> {
        let key = self.open(view, path, KEY_READ).map_err(|e| store_error(e, path))?;
        key.enum_keys().map(|entry| entry.map_err(|e| store_error(e, path))).collect()
    }

    fn get_value(&self, view: HiveView, path: &str, name: &str) -> Result<Option<RegistryValue>, StoreError> {
        let key = self.open(view, path, KEY_READ).map_err(|e| store_error(e, path))?;
        let raw = query_raw_value(&key, name).map_err(|status| status_error(status, path))?;
        Ok(raw.map(|(code, bytes)| RegistryValue::from_raw(name, code, &bytes)))
    }

    fn create_key(&mut self, view: HiveView, path: &str) -> Result<(), StoreError> {
        predef(view.hive)
            .create_subkey_with_flags(path, KEY_ALL_ACCESS | view_flag(view.redirection))
            .map(|_| ())
            .map_err(|e| store_error(e, path))
    }

    fn set_value(&mut self, view: HiveView, path: &str, value: &RegistryValue) -> Result<(), StoreError> {
        let key = self.open(view, path, KEY_ALL_ACCESS).map_err(|e| store_error(e, path))?;
        set_raw_value(&key, value)
    }

    fn delete_value(&mut self, view: HiveView, path: &str, name: &str) -> Result<bool, StoreError> {
        let key = self.open(view, path, KEY_ALL_ACCESS).map_err(|e| store_error(e, path))?;
        match key.delete_value(name) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(store_error(e, path)),
        }
    }

    fn delete_key(&mut self, view: HiveView, path: &str) -> Result<(), StoreError> {
        if path.is_empty() {
            return Err(StoreError::HiveRoot);
        }
        let (parent, name) = split_parent(path);
        let parent_key = self.open(view, parent, KEY_ALL_ACCESS).map_err(|e| store_error(e, path))?;
        parent_key.delete_subkey_all(name).map_err(|e| store_error(e, path))
    }
}
