use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a, 0xff]), "0aff");
}

// =============================================================================
// SessionId
// =============================================================================

#[test]
fn session_id_is_16_hex_chars() {
    let id = SessionId::generate();
    assert_eq!(id.as_str().len(), 16);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn session_ids_differ() {
    assert_ne!(SessionId::generate(), SessionId::generate());
}

#[test]
fn session_id_display_is_raw_token() {
    let id = SessionId::from("00ff00ff00ff00ff");
    assert_eq!(id.to_string(), "00ff00ff00ff00ff");
}

// =============================================================================
// VisitorId
// =============================================================================

#[test]
fn visitor_id_is_32_hex_chars() {
    let id = VisitorId::generate();
    assert_eq!(id.as_str().len(), 32);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn visitor_id_parse_accepts_hex_and_normalizes_case() {
    let id = VisitorId::parse("DEADbeef").unwrap();
    assert_eq!(id.as_str(), "deadbeef");
}

#[test]
fn visitor_id_parse_rejects_malformed() {
    assert!(VisitorId::parse("").is_none());
    assert!(VisitorId::parse("not-hex!").is_none());
    assert!(VisitorId::parse("abc def").is_none());
    assert!(VisitorId::parse(&"a".repeat(MAX_VISITOR_ID_LEN + 1)).is_none());
    assert!(VisitorId::parse(&"a".repeat(MAX_VISITOR_ID_LEN)).is_some());
}

#[test]
fn from_cookie_reuses_valid_value() {
    let (id, fresh) = VisitorId::from_cookie_or_generate(Some("0123abcd"));
    assert_eq!(id.as_str(), "0123abcd");
    assert!(!fresh);
}

#[test]
fn from_cookie_generates_when_missing_or_invalid() {
    let (id, fresh) = VisitorId::from_cookie_or_generate(None);
    assert!(fresh);
    assert_eq!(id.as_str().len(), 32);

    let (id, fresh) = VisitorId::from_cookie_or_generate(Some("'; DROP TABLE visitors; --"));
    assert!(fresh);
    assert_eq!(id.as_str().len(), 32);
}
