//! Property-based tests for Record keys and encoding
//!
//! Identities and attribute maps are generated at random to check that the
//! composite key is injective over valid identities, that the delimiter is
//! always refused, and that a stored record decodes only under its own kind.

use papernet::{CompositeKey, LedgerError, Record, workflow::WORKFLOWS};
use proptest::prelude::*;
use std::collections::BTreeMap;

// PROPERTY TEST STRATEGIES

/// Strategy to generate a single identity field: non-empty, no NUL
fn field_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 :._-]{1,16}"
}

/// Strategy to generate an issuer and paper number pair
fn identity_strategy() -> impl Strategy<Value = Vec<String>> {
    (field_strategy(), field_strategy()).prop_map(|(issuer, number)| vec![issuer, number])
}

/// Strategy to generate business attributes
fn attributes_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-zA-Z]{1,12}", ".{0,24}", 0..6)
}

fn kind_strategy() -> impl Strategy<Value = &'static str> {
    (0..WORKFLOWS.len()).prop_map(|i| WORKFLOWS[i].kind)
}

// PROPERTY TESTS
proptest! {
    /// Property: a record survives serialization under its own kind
    #[test]
    fn prop_record_survives_encoding(
        kind in kind_strategy(),
        identity in identity_strategy(),
        attributes in attributes_strategy(),
    ) {
        let record = Record::create(kind, identity, attributes).unwrap();
        let bytes = record.serialize().unwrap();

        prop_assert_eq!(Record::deserialize(&bytes, kind).unwrap(), record);
    }

    /// Property: decoding under another kind is always refused
    #[test]
    fn prop_record_rejects_foreign_kind(
        kind in kind_strategy(),
        other in kind_strategy(),
        identity in identity_strategy(),
    ) {
        prop_assume!(kind != other);

        let bytes = Record::create(kind, identity, BTreeMap::new())
            .unwrap()
            .serialize()
            .unwrap();
        let is_deserialization_error = matches!(
            Record::deserialize(&bytes, other),
            Err(LedgerError::Deserialization { .. })
        );
        prop_assert!(is_deserialization_error);
    }

    /// Property: distinct identities never share a key, even when ':' appears in a field
    #[test]
    fn prop_distinct_identities_distinct_keys(
        a in identity_strategy(),
        b in identity_strategy(),
    ) {
        let key_a = CompositeKey::from_identity(a.as_slice()).unwrap();
        let key_b = CompositeKey::from_identity(b.as_slice()).unwrap();

        prop_assert_eq!(a == b, key_a == key_b);
    }

    /// Property: a NUL anywhere in an identity field is refused
    #[test]
    fn prop_delimiter_is_refused(
        prefix in "[a-z]{0,8}",
        suffix in "[a-z]{0,8}",
        number in field_strategy(),
    ) {
        let issuer = format!("{prefix}\u{0}{suffix}");

        let is_invalid_argument = matches!(
            CompositeKey::from_identity(&[issuer.as_str(), number.as_str()]),
            Err(LedgerError::InvalidArgument(_))
        );
        prop_assert!(is_invalid_argument);
    }
}

/// Empty identity fields are refused
#[test]
fn empty_field_is_refused() {
    assert!(CompositeKey::from_identity(&["", "0001"]).is_err());
    assert!(CompositeKey::from_identity(&["BankA", ""]).is_err());
    assert!(
        Record::create(
            "org.papernet.letterofcredit",
            vec![String::new(), "0001".into()],
            BTreeMap::new()
        )
        .is_err()
    );
}
