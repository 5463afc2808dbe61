//! Tests for the value codec
//!
//! These tests verify:
//! - Exact round trips for scalars and structured values
//! - String identity preservation for JSON-looking text
//! - Permissive decoding of foreign/malformed text

use serde_json::json;
use shelfdb::codec::{decode, encode, TAG_JSON, TAG_STRING};
use shelfdb::Value;

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_roundtrip_string() {
    let value = json!("hello world");

    assert_eq!(decode(&encode(&value)), value);
}

#[test]
fn test_roundtrip_empty_string() {
    let value = json!("");

    assert_eq!(decode(&encode(&value)), value);
}

#[test]
fn test_roundtrip_numbers() {
    for value in [json!(0), json!(42), json!(-17), json!(2.5), json!(1e10)] {
        assert_eq!(decode(&encode(&value)), value);
    }
}

#[test]
fn test_roundtrip_booleans_and_null() {
    for value in [json!(true), json!(false), json!(null)] {
        assert_eq!(decode(&encode(&value)), value);
    }
}

#[test]
fn test_roundtrip_array() {
    let value = json!([1, "two", 3.0, null, [4]]);

    assert_eq!(decode(&encode(&value)), value);
}

#[test]
fn test_roundtrip_nested_object() {
    let value = json!({"a": 1, "b": {"c": [true, null], "d": "text"}});

    assert_eq!(decode(&encode(&value)), value);
}

#[test]
fn test_roundtrip_string_with_unicode() {
    let value = json!("héllo wörld 日本");

    assert_eq!(decode(&encode(&value)), value);
}

// =============================================================================
// Tag Discrimination Tests
// =============================================================================

#[test]
fn test_strings_that_look_like_json_stay_strings() {
    for text in ["123", "-4", "2.5", "true", "false", "null", "{\"a\":1}", "[1,2]"] {
        let value = json!(text);
        assert_eq!(decode(&encode(&value)), value, "string {:?} lost identity", text);
    }
}

#[test]
fn test_string_encoding_is_tag_plus_raw_bytes() {
    let encoded = encode(&json!("plain"));

    assert_eq!(encoded.as_bytes()[0], TAG_STRING);
    assert_eq!(&encoded[1..], "plain");
}

#[test]
fn test_structured_encoding_is_tag_plus_json() {
    let encoded = encode(&json!(42));

    assert_eq!(encoded.as_bytes()[0], TAG_JSON);
    assert_eq!(&encoded[1..], "42");
}

// =============================================================================
// Permissive Decoding Tests
// =============================================================================

#[test]
fn test_decode_unknown_tag_falls_back_to_raw_string() {
    assert_eq!(decode("xhello"), Value::String("xhello".to_string()));
    assert_eq!(decode("42"), Value::String("42".to_string()));
}

#[test]
fn test_decode_empty_text() {
    assert_eq!(decode(""), Value::String(String::new()));
}

#[test]
fn test_decode_malformed_json_payload_falls_back() {
    // 'j' tag but unparseable payload decodes as the payload text
    assert_eq!(decode("jnot-json"), Value::String("not-json".to_string()));
}
