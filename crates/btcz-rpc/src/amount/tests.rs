//! Unit tests for amount formatting and verification.

use rstest::rstest;
use serde_json::{Value, json};

use super::*;

#[rstest]
#[case::whole("1", "1.00")]
#[case::one_decimal("2.5", "2.50")]
#[case::eight_decimals("0.12345678", "0.12345678")]
#[case::satoshi("0.00000001", "0.00000001")]
#[case::rounded("1.123456789", "1.12345679")]
#[case::exponent("1e-5", "0.00001")]
#[case::padded(" 12.3400 ", "12.34")]
#[case::large("21000000000", "21000000000.00")]
fn formats_fixed_point(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(format_amount(input).expect("valid amount"), expected);
}

#[rstest]
#[case::text("ten")]
#[case::negative("-1")]
#[case::empty("")]
#[case::infinite("inf")]
fn rejects_invalid_amounts(#[case] input: &str) {
    assert!(matches!(
        format_amount(input),
        Err(RpcError::InvalidAmount { .. })
    ));
}

#[rstest]
#[case::missing(None, "0.0001")]
#[case::blank(Some("  "), "0.0001")]
#[case::given(Some("0.001"), "0.001")]
fn fee_defaults_when_blank(#[case] fee: Option<&str>, #[case] expected: &str) {
    assert_eq!(format_fee(fee).expect("valid fee"), expected);
}

#[test]
fn fragment_contains_address_memo_and_decimal_amount() {
    let fragment = send_many_fragment("zs1recipient", "1.5", Some("hi")).expect("fragment");
    assert_eq!(
        fragment,
        r#"[{"address":"zs1recipient","memo":"6869","amount":1.50}]"#
    );
    let parsed: Value = serde_json::from_str(&fragment).expect("valid json");
    assert_eq!(parsed[0]["amount"], json!(1.5));
}

#[test]
fn blank_memo_is_omitted() {
    let fragment = send_many_fragment("t1abc", "0.1", Some("   ")).expect("fragment");
    assert_eq!(fragment, r#"[{"address":"t1abc","amount":0.10}]"#);
}

#[test]
fn address_is_json_escaped() {
    let fragment = send_many_fragment("t1\"x", "1", None).expect("fragment");
    let parsed: Value = serde_json::from_str(&fragment).expect("valid json");
    assert_eq!(parsed[0]["address"], json!("t1\"x"));
}

#[rstest]
#[case::integral(r#"[{"address":"t1","amount":1}]"#, "1")]
#[case::different(r#"[{"address":"t1","amount":1.00000002}]"#, "1")]
#[case::missing(r#"[{"address":"t1"}]"#, "1")]
#[case::garbage("not json", "1")]
fn verification_rejects_altered_amounts(#[case] fragment: &str, #[case] requested: &str) {
    assert!(matches!(
        verify_send_many_fragment(fragment, requested),
        Err(RpcError::AmountFormatting { .. })
    ));
}

#[test]
fn verification_accepts_rounding_within_tolerance() {
    verify_send_many_fragment(r#"[{"address":"t1","amount":1.00000001}]"#, "1.000000005")
        .expect("within tolerance");
}

#[rstest]
#[case::text("hello", "68656c6c6f")]
#[case::unicode("é", "c3a9")]
#[case::empty("", "")]
fn memos_are_hex_encoded(#[case] memo: &str, #[case] expected: &str) {
    assert_eq!(encode_memo(memo), expected);
}

#[rstest]
#[case::padded("68690000", Some("hi"))]
#[case::no_memo("f600000000", None)]
#[case::odd("686", None)]
#[case::not_hex("zz", None)]
fn memos_are_decoded(#[case] hex: &str, #[case] expected: Option<&str>) {
    assert_eq!(decode_memo(hex).as_deref(), expected);
}
