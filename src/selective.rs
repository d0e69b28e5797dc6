//! Selective JSON serialization
//!
//! Renders request objects for partial updates. Each object walks its own
//! fields through an [`ObjectWriter`] and carries a [`Directives`] pair:
//!
//! - `force_send` - plain fields emitted even when they hold their zero value
//! - `null` - fields emitted as JSON `null`
//!
//! Emission rules, checked in this order:
//!
//! 1. A field in the null set is emitted as `null`. If it holds a non-empty
//!    value (non-zero number, `true`, non-empty text, collection or nested
//!    object) that is a caller error and encoding fails with
//!    [`Error::InvalidState`]. A zero value such as `Field::Set(0)` is
//!    accepted and replaced by `null`. The null set wins over `force_send`.
//! 2. `Field::Null` is emitted as `null`, `Field::Set` verbatim (zero values
//!    included), `Field::Absent` is omitted. `force_send` has no value to
//!    send for an absent field and is ignored there.
//! 3. Plain values are omitted when empty (zero number, `false`, empty text,
//!    empty collection, `None`) unless listed in `force_send`.
//!
//! Nested objects are encoded recursively with their own directives. An
//! object reached again while it is still being encoded fails with
//! [`Error::CyclicStructure`].

use crate::error::{Error, Result};
use crate::field::Field;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-object overrides of the omit-if-empty rule, keyed by wire field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    force_send: BTreeSet<String>,
    null: BTreeSet<String>,
}

/// No overrides; usable in statics for wrapper objects
pub static NO_DIRECTIVES: Directives = Directives::new();

impl Directives {
    pub const fn new() -> Self {
        Self {
            force_send: BTreeSet::new(),
            null: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn force_send(mut self, name: impl Into<String>) -> Self {
        self.force_send.insert(name.into());
        self
    }

    #[must_use]
    pub fn null(mut self, name: impl Into<String>) -> Self {
        self.null.insert(name.into());
        self
    }

    pub fn add_force_send(&mut self, name: impl Into<String>) {
        self.force_send.insert(name.into());
    }

    pub fn add_null(&mut self, name: impl Into<String>) {
        self.null.insert(name.into());
    }

    pub fn is_force_send(&self, name: &str) -> bool {
        self.force_send.contains(name)
    }

    pub fn is_null(&self, name: &str) -> bool {
        self.null.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.force_send.is_empty() && self.null.is_empty()
    }
}

/// An object that can be rendered selectively.
///
/// Implementations call one [`ObjectWriter`] method per declared field:
///
/// ```ignore
/// impl Resource for Account {
///     fn directives(&self) -> &Directives {
///         &self.directives
///     }
///
///     fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
///         w.field("name", &self.name)?;
///         w.object("organization", &self.organization)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Resource {
    fn directives(&self) -> &Directives;

    fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()>;
}

/// Zero-value test for plain (non-[`Field`]) values
pub trait IsEmpty {
    fn is_empty_value(&self) -> bool;
}

macro_rules! impl_is_empty_int {
    ($($t:ty),*) => {
        $(impl IsEmpty for $t {
            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        })*
    };
}

impl_is_empty_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl IsEmpty for f32 {
    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl IsEmpty for f64 {
    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl IsEmpty for bool {
    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl IsEmpty for str {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl IsEmpty for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for [T] {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> IsEmpty for HashMap<K, V, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsEmpty for BTreeMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl IsEmpty for Value {
    fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
        }
    }
}

impl<T: IsEmpty + ?Sized> IsEmpty for &T {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

/// Identity of an object on the ancestor chain: address plus concrete type,
/// so a struct and its first field (same address) are not confused.
type NodeKey = (usize, &'static str);

#[derive(Default)]
struct Encoder {
    ancestors: Vec<NodeKey>,
    path: Vec<String>,
}

impl Encoder {
    fn encode<R: Resource + ?Sized>(&mut self, resource: &R, directives: &Directives) -> Result<Value> {
        let key: NodeKey = (
            resource as *const R as *const () as usize,
            std::any::type_name::<R>(),
        );
        if self.ancestors.contains(&key) {
            return Err(Error::CyclicStructure {
                path: self.path_string(),
            });
        }

        self.ancestors.push(key);
        let mut writer = ObjectWriter {
            encoder: self,
            directives,
            map: Map::new(),
        };
        let written = resource.write_fields(&mut writer);
        let map = writer.map;
        self.ancestors.pop();

        written.map(|()| Value::Object(map))
    }

    fn path_string(&self) -> String {
        if self.path.is_empty() {
            "$".to_string()
        } else {
            format!("$.{}", self.path.join("."))
        }
    }

    fn qualified(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        }
    }
}

/// Field visitor handed to [`Resource::write_fields`]
pub struct ObjectWriter<'a> {
    encoder: &'a mut Encoder,
    directives: &'a Directives,
    map: Map<String, Value>,
}

impl ObjectWriter<'_> {
    /// Three-state field
    pub fn field<T: Serialize>(&mut self, name: &str, value: &Field<T>) -> Result<()> {
        match value {
            Field::Absent => self.null_if_listed(name, false).map(drop),
            Field::Null => {
                self.map.insert(name.to_string(), Value::Null);
                Ok(())
            }
            Field::Set(v) => {
                let v = self.to_json(name, v)?;
                if !self.null_if_listed(name, !v.is_empty_value())? {
                    self.map.insert(name.to_string(), v);
                }
                Ok(())
            }
        }
    }

    /// Plain value, omitted when empty unless force-sent
    pub fn value<T: Serialize + IsEmpty + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        let empty = value.is_empty_value();
        if self.null_if_listed(name, !empty)? {
            return Ok(());
        }
        if empty && !self.directives.is_force_send(name) {
            return Ok(());
        }
        let v = self.to_json(name, value)?;
        self.map.insert(name.to_string(), v);
        Ok(())
    }

    /// Optional nested object
    pub fn object<R: Resource>(&mut self, name: &str, value: &Field<R>) -> Result<()> {
        match value {
            Field::Absent => self.null_if_listed(name, false).map(drop),
            Field::Null => {
                self.map.insert(name.to_string(), Value::Null);
                Ok(())
            }
            Field::Set(r) => self.embed(name, r),
        }
    }

    /// Always-present nested object
    pub fn embed<R: Resource + ?Sized>(&mut self, name: &str, value: &R) -> Result<()> {
        let encoded = self.nested(name.to_string(), value)?;
        if !self.null_if_listed(name, !encoded.is_empty_value())? {
            self.map.insert(name.to_string(), encoded);
        }
        Ok(())
    }

    /// Optional list of nested objects
    pub fn objects<R: Resource>(&mut self, name: &str, value: &Field<Vec<R>>) -> Result<()> {
        match value {
            Field::Absent => self.null_if_listed(name, false).map(drop),
            Field::Null => {
                self.map.insert(name.to_string(), Value::Null);
                Ok(())
            }
            Field::Set(items) => {
                if self.null_if_listed(name, !items.is_empty())? {
                    return Ok(());
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.nested(format!("{name}[{i}]"), item)?);
                }
                self.map.insert(name.to_string(), Value::Array(out));
                Ok(())
            }
        }
    }

    fn nested<R: Resource + ?Sized>(&mut self, segment: String, value: &R) -> Result<Value> {
        self.encoder.path.push(segment);
        let encoded = self.encoder.encode(value, value.directives());
        self.encoder.path.pop();
        encoded
    }

    /// Emit `null` for a field in the null set. Returns true when handled.
    fn null_if_listed(&mut self, name: &str, has_value: bool) -> Result<bool> {
        if !self.directives.is_null(name) {
            return Ok(false);
        }
        if has_value {
            return Err(Error::InvalidState {
                field: self.encoder.qualified(name),
            });
        }
        self.map.insert(name.to_string(), Value::Null);
        Ok(true)
    }

    fn to_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<Value> {
        serde_json::to_value(value).map_err(|e| {
            Error::Request(format!("cannot encode field {}: {e}", self.encoder.qualified(name)))
        })
    }
}

/// Encode using the object's own directives
pub fn to_value<R: Resource + ?Sized>(resource: &R) -> Result<Value> {
    Encoder::default().encode(resource, resource.directives())
}

/// Encode with explicit top-level directives in place of the object's own.
/// Nested objects still use theirs.
pub fn to_value_with<R: Resource + ?Sized>(resource: &R, directives: &Directives) -> Result<Value> {
    Encoder::default().encode(resource, directives)
}

pub fn to_vec<R: Resource + ?Sized>(resource: &R) -> Result<Vec<u8>> {
    into_bytes(&to_value(resource)?)
}

pub fn to_vec_with<R: Resource + ?Sized>(resource: &R, directives: &Directives) -> Result<Vec<u8>> {
    into_bytes(&to_value_with(resource, directives)?)
}

fn into_bytes(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Request(format!("cannot encode body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::OnceCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Limits {
        directives: Directives,
        max_vcpu: Field<u32>,
        min_count: u32,
    }

    impl Resource for Limits {
        fn directives(&self) -> &Directives {
            &self.directives
        }

        fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
            w.field("maxVCpu", &self.max_vcpu)?;
            w.value("minCount", &self.min_count)?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Cluster {
        directives: Directives,
        name: Field<String>,
        description: Field<String>,
        tags: Field<Vec<String>>,
        zones: Vec<String>,
        spot_percentage: u32,
        limits: Field<Limits>,
        headrooms: Field<Vec<Limits>>,
    }

    impl Resource for Cluster {
        fn directives(&self) -> &Directives {
            &self.directives
        }

        fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
            w.field("name", &self.name)?;
            w.field("description", &self.description)?;
            w.field("tags", &self.tags)?;
            w.value("zones", &self.zones)?;
            w.value("spotPercentage", &self.spot_percentage)?;
            w.object("limits", &self.limits)?;
            w.objects("headrooms", &self.headrooms)?;
            Ok(())
        }
    }

    #[test]
    fn test_create_scenario() {
        let cluster = Cluster {
            name: "foo".into(),
            tags: Field::Null,
            ..Default::default()
        };
        assert_eq!(to_value(&cluster).unwrap(), json!({"name": "foo", "tags": null}));
    }

    #[test]
    fn test_zero_plain_value_omitted_unless_forced() {
        let mut cluster = Cluster::default();
        assert_eq!(to_value(&cluster).unwrap(), json!({}));

        cluster.directives.add_force_send("spotPercentage");
        cluster.directives.add_force_send("zones");
        assert_eq!(
            to_value(&cluster).unwrap(),
            json!({"spotPercentage": 0, "zones": []})
        );
    }

    #[test]
    fn test_set_zero_is_emitted() {
        let limits = Limits {
            max_vcpu: Field::Set(0),
            ..Default::default()
        };
        assert_eq!(to_value(&limits).unwrap(), json!({"maxVCpu": 0}));
    }

    #[test]
    fn test_force_send_ignored_for_absent_field() {
        let cluster = Cluster {
            directives: Directives::new().force_send("description"),
            ..Default::default()
        };
        assert_eq!(to_value(&cluster).unwrap(), json!({}));
    }

    #[test]
    fn test_null_set_emits_null() {
        let cluster = Cluster {
            directives: Directives::new().null("description").null("zones"),
            ..Default::default()
        };
        assert_eq!(
            to_value(&cluster).unwrap(),
            json!({"description": null, "zones": null})
        );
    }

    #[test]
    fn test_null_wins_over_force_send() {
        let cluster = Cluster {
            directives: Directives::new().force_send("spotPercentage").null("spotPercentage"),
            ..Default::default()
        };
        assert_eq!(to_value(&cluster).unwrap(), json!({"spotPercentage": null}));
    }

    #[test]
    fn test_null_set_with_value_is_invalid_state() {
        let cluster = Cluster {
            directives: Directives::new().null("name"),
            name: "foo".into(),
            ..Default::default()
        };
        let err = to_value(&cluster).unwrap_err();
        assert!(matches!(err, Error::InvalidState { ref field } if field == "name"));

        let cluster = Cluster {
            directives: Directives::new().null("zones"),
            zones: vec!["1".to_string()],
            ..Default::default()
        };
        assert!(matches!(to_value(&cluster), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_null_set_accepts_zero_values() {
        let limits = Limits {
            directives: Directives::new().null("maxVCpu").null("minCount"),
            max_vcpu: Field::Set(0),
            min_count: 0,
        };
        assert_eq!(to_value(&limits).unwrap(), json!({"maxVCpu": null, "minCount": null}));

        let cluster = Cluster {
            directives: Directives::new()
                .null("name")
                .null("tags")
                .null("limits")
                .null("headrooms"),
            name: Field::Set(String::new()),
            tags: Field::Set(Vec::new()),
            limits: Field::Set(Limits::default()),
            headrooms: Field::Set(Vec::new()),
            ..Default::default()
        };
        assert_eq!(
            to_value(&cluster).unwrap(),
            json!({"name": null, "tags": null, "limits": null, "headrooms": null})
        );
    }

    #[test]
    fn test_null_set_rejects_non_empty_nested_values() {
        let cluster = Cluster {
            directives: Directives::new().null("limits"),
            limits: Field::Set(Limits {
                max_vcpu: Field::Set(4),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = to_value(&cluster).unwrap_err();
        assert!(matches!(err, Error::InvalidState { ref field } if field == "limits"));

        let cluster = Cluster {
            directives: Directives::new().null("headrooms"),
            headrooms: Field::Set(vec![Limits::default()]),
            ..Default::default()
        };
        let err = to_value(&cluster).unwrap_err();
        assert!(matches!(err, Error::InvalidState { ref field } if field == "headrooms"));

        let limits = Limits {
            directives: Directives::new().null("maxVCpu"),
            max_vcpu: Field::Set(2),
            ..Default::default()
        };
        assert!(matches!(to_value(&limits), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_nested_objects_use_their_own_directives() {
        let cluster = Cluster {
            directives: Directives::new().force_send("spotPercentage"),
            limits: Field::Set(Limits {
                directives: Directives::new().force_send("minCount"),
                ..Default::default()
            }),
            headrooms: Field::Set(vec![
                Limits::default(),
                Limits {
                    directives: Directives::new().null("maxVCpu"),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        assert_eq!(
            to_value(&cluster).unwrap(),
            json!({
                "spotPercentage": 0,
                "limits": {"minCount": 0},
                "headrooms": [{}, {"maxVCpu": null}]
            })
        );
    }

    #[test]
    fn test_nested_invalid_state_reports_path() {
        let cluster = Cluster {
            headrooms: Field::Set(vec![Limits {
                directives: Directives::new().null("maxVCpu"),
                max_vcpu: Field::Set(4),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let err = to_value(&cluster).unwrap_err();
        assert!(matches!(err, Error::InvalidState { ref field } if field == "headrooms[0].maxVCpu"));
    }

    #[test]
    fn test_explicit_directives_override_top_level_only() {
        let cluster = Cluster {
            directives: Directives::new().force_send("zones"),
            limits: Field::Set(Limits {
                directives: Directives::new().force_send("minCount"),
                ..Default::default()
            }),
            ..Default::default()
        };
        let bytes = to_vec_with(&cluster, &Directives::new().null("name")).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"name": null, "limits": {"minCount": 0}}));
    }

    struct Node {
        directives: Directives,
        name: String,
        next: OnceCell<Rc<Node>>,
    }

    impl Resource for Node {
        fn directives(&self) -> &Directives {
            &self.directives
        }

        fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
            w.value("name", &self.name)?;
            if let Some(next) = self.next.get() {
                w.embed("next", &**next)?;
            }
            Ok(())
        }
    }

    fn node(name: &str) -> Rc<Node> {
        Rc::new(Node {
            directives: Directives::new(),
            name: name.to_string(),
            next: OnceCell::new(),
        })
    }

    #[test]
    fn test_cycle_is_rejected() {
        let a = node("a");
        let b = node("b");
        let _ = a.next.set(b.clone());
        let _ = b.next.set(a.clone());

        let err = to_value(&*a).unwrap_err();
        assert!(matches!(err, Error::CyclicStructure { ref path } if path == "$.next.next"));
    }

    #[test]
    fn test_shared_but_acyclic_is_fine() {
        let a = node("a");
        let b = node("b");
        let _ = a.next.set(b);
        assert_eq!(
            to_value(&*a).unwrap(),
            json!({"name": "a", "next": {"name": "b"}})
        );
    }
}
