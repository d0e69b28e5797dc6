//! Property-based tests using proptest
//!
//! These tests verify the selective encoder's emission rules and the
//! configuration merge using randomized inputs.

use proptest::prelude::*;
use serde_json::Value;
use spotkit::config::{self, Config};
use spotkit::error::Error;
use spotkit::selective::{self, Directives, IsEmpty, ObjectWriter, Resource};
use spotkit::Field;
use std::time::Duration;

const NAMES: [&str; 4] = ["name", "size", "count", "label"];

/// Group-like object mixing three-state and plain fields
#[derive(Debug, Clone)]
struct Group {
    directives: Directives,
    name: Field<String>,
    size: Field<i64>,
    count: u32,
    label: String,
}

impl Resource for Group {
    fn directives(&self) -> &Directives {
        &self.directives
    }

    fn write_fields(&self, w: &mut ObjectWriter<'_>) -> spotkit::Result<()> {
        w.field("name", &self.name)?;
        w.field("size", &self.size)?;
        w.value("count", &self.count)?;
        w.value("label", &self.label)
    }
}

/// Generate an arbitrary three-state field
fn arb_field<T: std::fmt::Debug + Clone + 'static>(
    value: impl Strategy<Value = T> + 'static,
) -> impl Strategy<Value = Field<T>> {
    prop_oneof![
        Just(Field::Absent),
        Just(Field::Null),
        value.prop_map(Field::Set),
    ]
}

/// Generate a subset of the wire names
fn arb_names() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(NAMES.to_vec(), 0..=NAMES.len())
}

fn arb_group() -> impl Strategy<Value = Group> {
    (
        arb_field("[a-z]{0,8}"),
        arb_field(-3i64..3),
        0u32..3,
        "[a-z]{0,2}",
        arb_names(),
        arb_names(),
    )
        .prop_map(|(name, size, count, label, force, null)| {
            let mut directives = Directives::new();
            for f in force {
                directives.add_force_send(f);
            }
            for n in null {
                directives.add_null(n);
            }
            Group {
                directives,
                name,
                size,
                count,
                label,
            }
        })
}

/// What the encoder must emit for one field, or `Err` when it must fail
fn expected_field(directives: &Directives, name: &str, value: Option<Value>, has_value: bool) -> Result<Option<Value>, ()> {
    if directives.is_null(name) {
        return if has_value { Err(()) } else { Ok(Some(Value::Null)) };
    }
    Ok(value)
}

fn expected_three_state<T: serde::Serialize>(directives: &Directives, name: &str, field: &Field<T>) -> Result<Option<Value>, ()> {
    let value = match field {
        Field::Absent => None,
        Field::Null => Some(Value::Null),
        Field::Set(v) => Some(serde_json::to_value(v).unwrap()),
    };
    // Only a non-empty Set value conflicts with the null set
    let has_value = value.as_ref().is_some_and(|v| !v.is_empty_value());
    expected_field(directives, name, value, has_value)
}

fn expected_plain<T: serde::Serialize>(directives: &Directives, name: &str, v: &T, empty: bool) -> Result<Option<Value>, ()> {
    let value = if empty && !directives.is_force_send(name) {
        None
    } else {
        Some(serde_json::to_value(v).unwrap())
    };
    expected_field(directives, name, value, !empty)
}

fn arb_config() -> impl Strategy<Value = Config> {
    (
        arb_field("[a-z]{1,6}"),
        arb_field("act-[a-z0-9]{1,4}"),
        arb_field(1u32..6),
        arb_field(1u64..60),
    )
        .prop_map(|(token, account_id, attempts, timeout)| {
            let mut config = Config::new();
            config.token = token;
            config.account_id = account_id;
            config.retry.max_attempts = attempts;
            config.timeout = timeout.map(Duration::from_secs);
            config
        })
}

proptest! {
    /// Every field follows the emission rules, and nothing else is emitted
    #[test]
    fn encoder_follows_emission_rules(group in arb_group()) {
        let d = &group.directives;
        let expected = [
            ("name", expected_three_state(d, "name", &group.name)),
            ("size", expected_three_state(d, "size", &group.size)),
            ("count", expected_plain(d, "count", &group.count, group.count == 0)),
            ("label", expected_plain(d, "label", &group.label, group.label.is_empty())),
        ];

        let must_fail = expected.iter().any(|(_, e)| e.is_err());
        match selective::to_value(&group) {
            Err(Error::InvalidState { field }) => {
                prop_assert!(must_fail);
                prop_assert!(NAMES.contains(&field.as_str()));
            }
            Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            Ok(Value::Object(map)) => {
                prop_assert!(!must_fail);
                for (name, e) in expected {
                    prop_assert_eq!(map.get(name).cloned(), e.unwrap());
                }
                prop_assert!(map.keys().all(|k| NAMES.contains(&k.as_str())));
            }
            Ok(other) => prop_assert!(false, "not an object: {other}"),
        }
    }

    /// A zero-valued Set field in the null set is sent as null
    #[test]
    fn null_set_replaces_zero_values(mut group in arb_group()) {
        group.size = Field::Set(0);
        group.name = Field::Set(String::new());
        group.directives.add_null("size");
        group.directives.add_null("name");
        if let Ok(Value::Object(map)) = selective::to_value(&group) {
            prop_assert_eq!(map.get("size"), Some(&Value::Null));
            prop_assert_eq!(map.get("name"), Some(&Value::Null));
        }
    }

    /// Absent fields never appear, whatever the force-send set says
    #[test]
    fn absent_is_never_emitted(mut group in arb_group()) {
        group.name = Field::Absent;
        group.size = Field::Absent;
        if let Ok(Value::Object(map)) = selective::to_value(&group) {
            let null_set = group.directives.is_null("name");
            prop_assert_eq!(map.contains_key("name"), null_set);
            prop_assert_eq!(map.contains_key("size"), group.directives.is_null("size"));
        }
    }

    /// Decoding an encoded object restores every three-state field
    #[test]
    fn encode_then_decode_restores_fields(
        name in arb_field("[a-z]{0,8}"),
        size in arb_field(-3i64..3),
    ) {
        let group = Group {
            directives: Directives::new(),
            name: name.clone(),
            size: size.clone(),
            count: 0,
            label: String::new(),
        };

        #[derive(serde::Deserialize)]
        struct Decoded {
            #[serde(default)]
            name: Field<String>,
            #[serde(default)]
            size: Field<i64>,
        }

        let value = selective::to_value(&group).unwrap();
        let decoded: Decoded = serde_json::from_value(value).unwrap();
        prop_assert_eq!(decoded.name, name);
        prop_assert_eq!(decoded.size, size);
    }

    /// Field merge is associative and Absent is its identity
    #[test]
    fn field_merge_is_associative(
        a in arb_field(0u8..4),
        b in arb_field(0u8..4),
        c in arb_field(0u8..4),
    ) {
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.clone().merge(b.merge(c));
        prop_assert_eq!(left, right);
        prop_assert_eq!(a.clone().merge(Field::Absent), a.clone());
        prop_assert_eq!(Field::Absent.merge(a.clone()), a);
    }

    /// Resolving the same layers twice gives equal results, and resolving
    /// pre-merged layers gives the same result as resolving them in sequence
    #[test]
    fn config_resolution_is_pure(low in arb_config(), high in arb_config()) {
        let first = config::resolve(&[&low, &high]);
        let second = config::resolve(&[&low, &high]);
        let merged = config::resolve(&[&low.merge(&high)]);

        match (first, second, merged) {
            (Ok(a), Ok(b), Ok(c)) => {
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(&a, &c);
            }
            (Err(_), Err(_), Err(_)) => {}
            _ => prop_assert!(false, "resolution outcome differs"),
        }
    }

    /// A Set value in a higher layer always wins
    #[test]
    fn higher_layer_set_wins(low in arb_config(), token in "[a-z]{1,6}") {
        let high = Config::new().with_token(token.clone());
        let resolved = config::resolve(&[&low, &high]).unwrap();
        prop_assert_eq!(resolved.credentials.token, token);
    }
}
