// Pagination cursor codec through the public API

use rstest::rstest;

use missionlens::cursor::{decode, encode, CursorError};
use missionlens::kv::{KeyScalar, ResumeKey};

#[rstest]
#[case("m-1")]
#[case("")]
#[case("with spaces and / slashes")]
#[case("ünïcødé-ミッション")]
#[case("{\"S\":\"looks like json\"}")]
fn test_string_keys_round_trip(#[case] value: &str) {
    let key = ResumeKey::string("id", value);
    assert_eq!(decode(&encode(&key).unwrap()).unwrap(), key);
}

#[rstest]
#[case("0")]
#[case("-17")]
#[case("3.25")]
#[case("1e9")]
fn test_numeric_keys_round_trip(#[case] value: &str) {
    let mut key = ResumeKey::new();
    key.insert("rank", KeyScalar::Num(value.to_string()));
    assert_eq!(decode(&encode(&key).unwrap()).unwrap(), key);
}

#[test]
fn test_composite_key_round_trips() {
    let mut key = ResumeKey::string("id", "m-9");
    key.insert("tca", KeyScalar::Num("1700000000".to_string()));
    let decoded = decode(&encode(&key).unwrap()).unwrap();
    assert_eq!(decoded, key);
    assert_eq!(decoded.len(), 2);
}

#[test]
fn test_tokens_need_no_url_escaping() {
    let key = ResumeKey::string("id", "???>>>~~~");
    let token = encode(&key).unwrap();
    assert_eq!(urlencoding::encode(&token), token);
}

#[test]
fn test_empty_key_is_not_encoded() {
    assert_eq!(encode(&ResumeKey::new()), Err(CursorError::EmptyKey));
}

#[rstest]
#[case("!!!")]
#[case("bm90IGpzb24")]
#[case("e30")]
#[case("eyJpZCI6eyJCIjoiQUFBQSJ9fQ")] // {"id":{"B":"AAAA"}}
fn test_malformed_tokens_are_rejected(#[case] token: &str) {
    let err: CursorError = decode(token).unwrap_err();
    assert!(!err.to_string().is_empty());
}
