use proptest::prelude::*;
use xmlreg::value_codec::{decode, encode, parse_type_tag, type_tag};
use xmlreg::*;

fn element(tag: &str, text: &str) -> ValueElement {
    let mut element = ValueElement::new("v", tag);
    element.text = text.to_string();
    element
}

#[test]
fn integers_are_written_as_signed_decimal() {
    let dword = RegistryValue::new("d", RegistryValueData::Dword(0xFFFF_FFFF));
    assert_eq!(encode(&dword).text, "-1");
    assert_eq!(encode(&dword).type_tag, "dword");

    let qword = RegistryValue::new("q", RegistryValueData::Qword(u64::MAX));
    assert_eq!(encode(&qword).text, "-1");

    let small = RegistryValue::new("d", RegistryValueData::Dword(42));
    assert_eq!(encode(&small).text, "42");
}

#[test]
fn wide_numbers_wrap_to_the_target_width() {
    let value = decode(&element("dword", "4294967297")).unwrap();
    assert_eq!(value.data, RegistryValueData::Dword(1));

    let value = decode(&element("qword", "18446744073709551615")).unwrap();
    assert_eq!(value.data, RegistryValueData::Qword(u64::MAX));

    let value = decode(&element("dword", " -2 ")).unwrap();
    assert_eq!(value.data, RegistryValueData::Dword(0xFFFF_FFFE));
}

#[test]
fn malformed_numbers_are_rejected() {
    let err = decode(&element("dword", "twelve")).unwrap_err();
    assert!(matches!(err, CodecError::InvalidNumber { tag: "dword", .. }));
}

#[test]
fn dword_be_text_is_symmetric() {
    for logical in [0u32, 1, 0xFFFF_FFFF, 0x0102_0304] {
        let value = RegistryValue::new("be", RegistryValueData::DwordBigEndian(logical));
        let encoded = encode(&value);
        assert_eq!(encoded.type_tag, "dword-be");
        assert_eq!(encoded.text, (logical as i32).to_string());

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.data, RegistryValueData::DwordBigEndian(logical));
        assert_eq!(decoded.raw_bytes(), logical.to_be_bytes().to_vec());
    }
}

#[test]
fn big_endian_raw_payload_reads_most_significant_byte_first() {
    let value = RegistryValue::from_raw("be", REG_DWORD_BIG_ENDIAN, &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(value.data, RegistryValueData::DwordBigEndian(0x0102_0304));
    assert_eq!(encode(&value).text, "16909060");
}

#[test]
fn binary_is_base64() {
    let value = RegistryValue::new("b", RegistryValueData::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF], REG_BINARY));
    let encoded = encode(&value);
    assert_eq!(encoded.type_tag, "binary");
    assert_eq!(encoded.text, "3q2+7w==");
    assert_eq!(decode(&encoded).unwrap(), value);

    assert!(matches!(
        decode(&element("binary", "!!not base64!!")),
        Err(CodecError::InvalidBase64(_))
    ));
}

#[test]
fn multi_string_keeps_items_in_order() {
    for items in [vec![], vec!["one".to_string()], vec!["a".into(), "b".into(), "c".into()]] {
        let value = RegistryValue::new("m", RegistryValueData::MultiString(items.clone()));
        let encoded = encode(&value);
        assert_eq!(encoded.type_tag, "multi-string");
        assert_eq!(encoded.items, items);
        assert_eq!(decode(&encoded).unwrap(), value);
    }
}

#[test]
fn unknown_tags_become_none_type() {
    let value = decode(&element("colour", "AQID")).unwrap();
    assert_eq!(value.reg_type(), REG_NONE);
    assert_eq!(value.data, RegistryValueData::Binary(vec![1, 2, 3], REG_NONE));

    let value = decode(&element("colour", "not base64 at all")).unwrap();
    assert_eq!(value.raw_bytes(), b"not base64 at all".to_vec());
}

#[test]
fn uncommon_types_travel_as_raw_bytes() {
    let link = RegistryValue::from_raw("l", REG_LINK, &[0x41, 0x00]);
    let encoded = encode(&link);
    assert_eq!(encoded.type_tag, "link");
    assert_eq!(decode(&encoded).unwrap().reg_type(), REG_LINK);

    let custom = RegistryValue::from_raw("c", 0x20, &[9, 9]);
    let encoded = encode(&custom);
    assert_eq!(encoded.type_tag, "raw:32");
    assert_eq!(decode(&encoded).unwrap(), custom);
}

#[test]
fn misfit_payload_keeps_its_type_code() {
    // Three bytes cannot be a dword.
    let odd = RegistryValue::from_raw("odd", REG_DWORD, &[1, 2, 3]);
    assert_eq!(odd.data, RegistryValueData::Binary(vec![1, 2, 3], REG_DWORD));

    let encoded = encode(&odd);
    assert_eq!(encoded.type_tag, "raw:4");
    let decoded = decode(&encoded).unwrap();
    assert_eq!(decoded.reg_type(), REG_DWORD);
    assert_eq!(decoded.raw_bytes(), vec![1, 2, 3]);
}

#[test]
fn tags_and_codes_correspond() {
    for code in 0..=11 {
        assert_eq!(parse_type_tag(&type_tag(code)), Some(code));
    }
    assert_eq!(parse_type_tag("raw:4096"), Some(4096));
    assert_eq!(parse_type_tag("dword "), None);
}

proptest! {
    #[test]
    fn dword_survives_encoding(v in any::<u32>()) {
        let value = RegistryValue::new("d", RegistryValueData::Dword(v));
        prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn qword_survives_encoding(v in any::<u64>()) {
        let value = RegistryValue::new("q", RegistryValueData::Qword(v));
        prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn strings_survive_encoding(s in "\\PC*") {
        let value = RegistryValue::new("s", RegistryValueData::String(s));
        prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn binary_survives_encoding(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let value = RegistryValue::new("b", RegistryValueData::Binary(bytes, REG_BINARY));
        prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
    }
}
