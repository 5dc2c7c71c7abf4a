//! Mapping between typed registry values and their XML representation.
//!
//! Textual forms: strings verbatim, integers as signed decimal, big-endian dwords as the
//! decimal of their byte-reversed interpretation, multi-strings as a list of items and
//! everything else as base64 of the raw payload.

use std::borrow::Cow;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use thiserror::Error;

use crate::fragment::ValueElement;
use crate::registry_value::{
    RegistryValue, RegistryValueData, REG_BINARY, REG_DWORD, REG_DWORD_BIG_ENDIAN, REG_EXPAND_SZ,
    REG_FULL_RESOURCE_DESCRIPTOR, REG_LINK, REG_MULTI_SZ, REG_NONE, REG_QWORD, REG_RESOURCE_LIST,
    REG_RESOURCE_REQUIREMENTS_LIST, REG_SZ,
};

const RAW_TAG_PREFIX: &str = "raw:";

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("'{text}' is not a valid {tag} number")]
    InvalidNumber { tag: &'static str, text: String },
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// Textual type tag for a numeric registry type.
pub fn type_tag(reg_type: u32) -> Cow<'static, str> {
    let tag = match reg_type {
        REG_NONE => "none",
        REG_SZ => "string",
        REG_EXPAND_SZ => "expand-string",
        REG_BINARY => "binary",
        REG_DWORD => "dword",
        REG_DWORD_BIG_ENDIAN => "dword-be",
        REG_LINK => "link",
        REG_MULTI_SZ => "multi-string",
        REG_RESOURCE_LIST => "resource-list",
        REG_FULL_RESOURCE_DESCRIPTOR => "full-resource-descriptor",
        REG_RESOURCE_REQUIREMENTS_LIST => "resource-requirements-list",
        REG_QWORD => "qword",
        other => return Cow::Owned(format!("{}{}", RAW_TAG_PREFIX, other)),
    };
    Cow::Borrowed(tag)
}

/// Numeric type for a tag, `None` when the tag is not recognized.
pub fn parse_type_tag(tag: &str) -> Option<u32> {
    let ty = match tag {
        "none" => REG_NONE,
        "string" => REG_SZ,
        "expand-string" => REG_EXPAND_SZ,
        "binary" => REG_BINARY,
        "dword" => REG_DWORD,
        "dword-be" => REG_DWORD_BIG_ENDIAN,
        "link" => REG_LINK,
        "multi-string" => REG_MULTI_SZ,
        "resource-list" => REG_RESOURCE_LIST,
        "full-resource-descriptor" => REG_FULL_RESOURCE_DESCRIPTOR,
        "resource-requirements-list" => REG_RESOURCE_REQUIREMENTS_LIST,
        "qword" => REG_QWORD,
        other => return other.strip_prefix(RAW_TAG_PREFIX)?.parse().ok(),
    };
    Some(ty)
}

/// Whether a numeric type is exported as base64 of its raw bytes.
pub fn is_raw_type(reg_type: u32) -> bool {
    !matches!(
        reg_type,
        REG_SZ | REG_EXPAND_SZ | REG_MULTI_SZ | REG_DWORD | REG_DWORD_BIG_ENDIAN | REG_QWORD
    )
}

pub fn encode(value: &RegistryValue) -> ValueElement {
    let tag = match &value.data {
        // A payload that does not fit its standard type travels as raw bytes.
        RegistryValueData::Binary(_, ty) if !is_raw_type(*ty) => {
            Cow::Owned(format!("{}{}", RAW_TAG_PREFIX, ty))
        }
        _ => type_tag(value.reg_type()),
    };
    let mut element = ValueElement::new(&value.name, tag);
    match &value.data {
        RegistryValueData::String(v) | RegistryValueData::ExpandString(v) => element.text = v.clone(),
        RegistryValueData::MultiString(items) => element.items = items.clone(),
        RegistryValueData::Dword(v) | RegistryValueData::DwordBigEndian(v) => {
            element.text = (*v as i32).to_string()
        }
        RegistryValueData::Qword(v) => element.text = (*v as i64).to_string(),
        RegistryValueData::Binary(bytes, _) => element.text = BASE64_STANDARD.encode(bytes),
    }
    element
}

/// Unrecognized tags decode as `REG_NONE`; the payload is still honoured as base64,
/// or as the raw text bytes if it is not base64.
pub fn decode(element: &ValueElement) -> Result<RegistryValue, CodecError> {
    let name = element.name.clone();
    if let Some(code) = element
        .type_tag
        .strip_prefix(RAW_TAG_PREFIX)
        .and_then(|code| code.parse::<u32>().ok())
    {
        let bytes = decode_base64(&element.text)?;
        return Ok(RegistryValue::new(name, RegistryValueData::Binary(bytes, code)));
    }
    let Some(reg_type) = parse_type_tag(&element.type_tag) else {
        let bytes = BASE64_STANDARD
            .decode(element.text.trim())
            .unwrap_or_else(|_| element.text.as_bytes().to_vec());
        return Ok(RegistryValue::new(name, RegistryValueData::Binary(bytes, REG_NONE)));
    };
    let data = match reg_type {
        REG_SZ => RegistryValueData::String(element.text.clone()),
        REG_EXPAND_SZ => RegistryValueData::ExpandString(element.text.clone()),
        REG_MULTI_SZ => RegistryValueData::MultiString(element.items.clone()),
        REG_DWORD => RegistryValueData::Dword(parse_number("dword", &element.text)? as u32),
        REG_DWORD_BIG_ENDIAN => {
            RegistryValueData::DwordBigEndian(parse_number("dword-be", &element.text)? as u32)
        }
        REG_QWORD => RegistryValueData::Qword(parse_number("qword", &element.text)? as u64),
        ty => RegistryValueData::Binary(decode_base64(&element.text)?, ty),
    };
    Ok(RegistryValue::new(name, data))
}

fn decode_base64(text: &str) -> Result<Vec<u8>, CodecError> {
    BASE64_STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

// Signed decimal, wider values wrap to the target width. Unsigned 64-bit text is
// accepted so qwords above i64::MAX survive hand-edited fragments.
fn parse_number(tag: &'static str, text: &str) -> Result<i64, CodecError> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .or_else(|_| trimmed.parse::<u64>().map(|v| v as i64))
        .map_err(|_| CodecError::InvalidNumber {
            tag,
            text: text.to_string(),
        })
}
