use std::fmt;

pub const REG_NONE: u32 = 0;
pub const REG_SZ: u32 = 1;
pub const REG_EXPAND_SZ: u32 = 2;
pub const REG_BINARY: u32 = 3;
pub const REG_DWORD: u32 = 4;
pub const REG_DWORD_BIG_ENDIAN: u32 = 5;
pub const REG_LINK: u32 = 6;
pub const REG_MULTI_SZ: u32 = 7;
pub const REG_RESOURCE_LIST: u32 = 8;
pub const REG_FULL_RESOURCE_DESCRIPTOR: u32 = 9;
pub const REG_RESOURCE_REQUIREMENTS_LIST: u32 = 10;
pub const REG_QWORD: u32 = 11;

/// Typed payload of a registry value. `Binary` carries the numeric type code so that
/// types without a dedicated variant keep their identity.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryValueData {
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Dword(u32),
    DwordBigEndian(u32),
    Qword(u64),
    Binary(Vec<u8>, u32),
}

/// A named value. The unnamed default value of a key has an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryValue {
    pub name: String,
    pub data: RegistryValueData,
}

impl RegistryValue {
    pub fn new(name: impl Into<String>, data: RegistryValueData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Rebuilds a value from the type code and bytes the registry API hands out.
    /// Payloads that do not fit their declared type are kept as raw bytes.
    pub fn from_raw(name: impl Into<String>, reg_type: u32, bytes: &[u8]) -> Self {
        let data = match reg_type {
            REG_SZ => RegistryValueData::String(utf16_to_string(bytes)),
            REG_EXPAND_SZ => RegistryValueData::ExpandString(utf16_to_string(bytes)),
            REG_MULTI_SZ => RegistryValueData::MultiString(utf16_to_list(bytes)),
            REG_DWORD if bytes.len() == 4 => {
                RegistryValueData::Dword(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            REG_DWORD_BIG_ENDIAN if bytes.len() == 4 => RegistryValueData::DwordBigEndian(
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            ),
            REG_QWORD if bytes.len() == 8 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                RegistryValueData::Qword(u64::from_le_bytes(arr))
            }
            ty => RegistryValueData::Binary(bytes.to_vec(), ty),
        };
        Self::new(name, data)
    }

    pub fn reg_type(&self) -> u32 {
        match self.data {
            RegistryValueData::String(_) => REG_SZ,
            RegistryValueData::ExpandString(_) => REG_EXPAND_SZ,
            RegistryValueData::MultiString(_) => REG_MULTI_SZ,
            RegistryValueData::Dword(_) => REG_DWORD,
            RegistryValueData::DwordBigEndian(_) => REG_DWORD_BIG_ENDIAN,
            RegistryValueData::Qword(_) => REG_QWORD,
            RegistryValueData::Binary(_, ty) => ty,
        }
    }

    pub fn raw_bytes(&self) -> Vec<u8> {
        match &self.data {
            RegistryValueData::String(v) | RegistryValueData::ExpandString(v) => {
                let mut bytes = v.encode_utf16().flat_map(|c| c.to_le_bytes()).collect::<Vec<_>>();
                bytes.extend_from_slice(&[0, 0]);
                bytes
            }
            RegistryValueData::MultiString(values) => {
                let mut bytes = Vec::new();
                for part in values {
                    bytes.extend(part.encode_utf16().flat_map(|c| c.to_le_bytes()));
                    bytes.extend_from_slice(&[0, 0]);
                }
                bytes.extend_from_slice(&[0, 0]);
                bytes
            }
            RegistryValueData::Dword(v) => v.to_le_bytes().to_vec(),
            RegistryValueData::DwordBigEndian(v) => v.to_be_bytes().to_vec(),
            RegistryValueData::Qword(v) => v.to_le_bytes().to_vec(),
            RegistryValueData::Binary(v, _) => v.clone(),
        }
    }

    /// True when the payload carries no content, whatever the type. String terminators
    /// are not content.
    pub fn is_empty_payload(&self) -> bool {
        match &self.data {
            RegistryValueData::String(v) | RegistryValueData::ExpandString(v) => v.is_empty(),
            RegistryValueData::MultiString(v) => v.is_empty(),
            RegistryValueData::Binary(v, _) => v.is_empty(),
            RegistryValueData::Dword(_)
            | RegistryValueData::DwordBigEndian(_)
            | RegistryValueData::Qword(_) => false,
        }
    }
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn utf16_to_string(bytes: &[u8]) -> String {
    let units = utf16_units(bytes);
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

// Empty items cannot be represented inside a multi-string and are dropped.
fn utf16_to_list(bytes: &[u8]) -> Vec<String> {
    utf16_units(bytes)
        .split(|&u| u == 0)
        .filter(|part| !part.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            RegistryValueData::String(v) => write!(f, "string:\"{}\"", v),
            RegistryValueData::ExpandString(v) => write!(f, "expand-string:\"{}\"", v),
            RegistryValueData::MultiString(v) => write!(f, "multi-string:{:?}", v),
            RegistryValueData::Dword(v) => write!(f, "dword:{:#010x}", v),
            RegistryValueData::DwordBigEndian(v) => write!(f, "dword-be:{:#010x}", v),
            RegistryValueData::Qword(v) => write!(f, "qword:{:#018x}", v),
            RegistryValueData::Binary(v, t) => write!(f, "hex({}):{}", t, v.len()),
        }
    }
}
