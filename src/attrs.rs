//! Typed access to the attributes of an imported node.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::value::Value;

/// Value of an attribute attached to an [`ExternalNode`](crate::ExternalNode).
///
/// Integers are always 64-bit and floats are always doubles, regardless of
/// the width used by the source format.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    String(String),
    Tensor(Value),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Return the kind tag of this value.
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Int(_) => AttrKind::Int,
            Self::Float(_) => AttrKind::Float,
            Self::String(_) => AttrKind::String,
            Self::Tensor(_) => AttrKind::Tensor,
            Self::List(_) => AttrKind::List,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(val: i64) -> Self {
        Self::Int(val)
    }
}

impl From<f64> for AttrValue {
    fn from(val: f64) -> Self {
        Self::Float(val)
    }
}

impl From<&str> for AttrValue {
    fn from(val: &str) -> Self {
        Self::String(val.to_string())
    }
}

impl From<Value> for AttrValue {
    fn from(val: Value) -> Self {
        Self::Tensor(val)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(vals: Vec<T>) -> Self {
        Self::List(vals.into_iter().map(|v| v.into()).collect())
    }
}

/// Kind tag for an [`AttrValue`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttrKind {
    Int,
    Float,
    String,
    Tensor,
    List,
}

impl Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Tensor => "tensor",
            Self::List => "list",
        };
        write!(f, "{}", name)
    }
}

/// Errors reading an attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttrError {
    /// The attribute is present but has a different kind than expected.
    TypeMismatch {
        attr: String,
        expected: AttrKind,
        actual: AttrKind,
    },
    /// An item of a list attribute has a different kind than expected.
    ListItemMismatch {
        attr: String,
        index: usize,
        expected: AttrKind,
        actual: AttrKind,
    },
    /// An attribute that the operator requires is absent.
    Missing { attr: String },
}

impl Display for AttrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                attr,
                expected,
                actual,
            } => write!(
                f,
                "attribute \"{}\" should be {} but is {}",
                attr, expected, actual
            ),
            Self::ListItemMismatch {
                attr,
                index,
                expected,
                actual,
            } => write!(
                f,
                "item {} of attribute \"{}\" should be {} but is {}",
                index, attr, expected, actual
            ),
            Self::Missing { attr } => write!(f, "required attribute \"{}\" missing", attr),
        }
    }
}

impl Error for AttrError {}

/// Conversion from an [`AttrValue`] into a Rust type.
pub trait FromAttr<'a>: Sized {
    /// The attribute kind this type is decoded from.
    const KIND: AttrKind;

    /// For list types, the kind of each item.
    const ITEM_KIND: Option<AttrKind> = None;

    /// Decode `val`, returning `None` if it has the wrong kind.
    fn from_attr(val: &'a AttrValue) -> Option<Self>;
}

impl FromAttr<'_> for i64 {
    const KIND: AttrKind = AttrKind::Int;

    fn from_attr(val: &AttrValue) -> Option<Self> {
        match val {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Booleans are encoded as ints, where zero means false.
impl FromAttr<'_> for bool {
    const KIND: AttrKind = AttrKind::Int;

    fn from_attr(val: &AttrValue) -> Option<Self> {
        i64::from_attr(val).map(|v| v != 0)
    }
}

impl FromAttr<'_> for f64 {
    const KIND: AttrKind = AttrKind::Float;

    fn from_attr(val: &AttrValue) -> Option<Self> {
        match val {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl<'a> FromAttr<'a> for &'a str {
    const KIND: AttrKind = AttrKind::String;

    fn from_attr(val: &'a AttrValue) -> Option<Self> {
        match val {
            AttrValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl<'a> FromAttr<'a> for &'a Value {
    const KIND: AttrKind = AttrKind::Tensor;

    fn from_attr(val: &'a AttrValue) -> Option<Self> {
        match val {
            AttrValue::Tensor(v) => Some(v),
            _ => None,
        }
    }
}

/// A list of ints. Lists containing any other kind of item are rejected.
impl FromAttr<'_> for Vec<i64> {
    const KIND: AttrKind = AttrKind::List;
    const ITEM_KIND: Option<AttrKind> = Some(AttrKind::Int);

    fn from_attr(val: &AttrValue) -> Option<Self> {
        match val {
            AttrValue::List(items) => items.iter().map(i64::from_attr).collect(),
            _ => None,
        }
    }
}

/// Wrapper around the attributes of an external node.
///
/// This provides methods to find attributes by name and convert them to a
/// target type. It also records which attributes have been read, to enable
/// detecting unsupported attributes.
pub struct Attrs<'a> {
    attrs: &'a FxHashMap<String, AttrValue>,
    used_attrs: RefCell<SmallVec<[&'static str; 4]>>,
}

impl<'a> Attrs<'a> {
    pub fn new(attrs: &'a FxHashMap<String, AttrValue>) -> Self {
        Self {
            attrs,
            used_attrs: RefCell::new(SmallVec::new()),
        }
    }

    /// Get an optional attribute, checking that it has the expected kind.
    ///
    /// Absence is not an error at this level. Callers supply a default, or
    /// use [`require`](Self::require) for mandatory attributes.
    pub fn get(
        &self,
        name: &'static str,
        kind: AttrKind,
    ) -> Result<Option<&'a AttrValue>, AttrError> {
        self.used_attrs.borrow_mut().push(name);
        let Some(val) = self.attrs.get(name) else {
            return Ok(None);
        };
        if val.kind() != kind {
            return Err(AttrError::TypeMismatch {
                attr: name.to_string(),
                expected: kind,
                actual: val.kind(),
            });
        }
        Ok(Some(val))
    }

    /// Get an optional attribute and decode it as `T`.
    pub fn get_as<T: FromAttr<'a>>(&self, name: &'static str) -> Result<Option<T>, AttrError> {
        let Some(val) = self.get(name, T::KIND)? else {
            return Ok(None);
        };
        if let Some(decoded) = T::from_attr(val) {
            return Ok(Some(decoded));
        }
        if let (Some(expected), AttrValue::List(items)) = (T::ITEM_KIND, val) {
            if let Some((index, item)) = items
                .iter()
                .enumerate()
                .find(|(_, item)| item.kind() != expected)
            {
                return Err(AttrError::ListItemMismatch {
                    attr: name.to_string(),
                    index,
                    expected,
                    actual: item.kind(),
                });
            }
        }
        Err(AttrError::TypeMismatch {
            attr: name.to_string(),
            expected: T::KIND,
            actual: val.kind(),
        })
    }

    /// Get a required attribute and decode it as `T`.
    pub fn require<T: FromAttr<'a>>(&self, name: &'static str) -> Result<T, AttrError> {
        self.get_as(name)?.ok_or_else(|| AttrError::Missing {
            attr: name.to_string(),
        })
    }

    /// Return the names of attributes which are present but were never read,
    /// in sorted order.
    pub fn unused(&self) -> Vec<&'a str> {
        let used = self.used_attrs.borrow();
        let mut unused: Vec<&str> = self
            .attrs
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !used.iter().any(|u| u == k))
            .collect();
        unused.sort_unstable();
        unused
    }
}

#[cfg(test)]
mod tests {
    use rten_tensor::Tensor;
    use rustc_hash::FxHashMap;

    use super::{AttrError, AttrKind, AttrValue, Attrs};
    use crate::value::Value;

    fn attr_map(entries: &[(&str, AttrValue)]) -> FxHashMap<String, AttrValue> {
        entries
            .iter()
            .map(|(name, val)| (name.to_string(), val.clone()))
            .collect()
    }

    #[test]
    fn test_get_as() {
        let map = attr_map(&[
            ("axis", AttrValue::Int(-1)),
            ("alpha", AttrValue::Float(0.5)),
            ("mode", "nearest".into()),
            ("perm", vec![0i64, 2, 1].into()),
        ]);
        let attrs = Attrs::new(&map);

        assert_eq!(attrs.get_as::<i64>("axis"), Ok(Some(-1)));
        assert_eq!(attrs.get_as::<bool>("axis"), Ok(Some(true)));
        assert_eq!(attrs.get_as::<f64>("alpha"), Ok(Some(0.5)));
        assert_eq!(attrs.get_as::<&str>("mode"), Ok(Some("nearest")));
        assert_eq!(attrs.get_as::<Vec<i64>>("perm"), Ok(Some(vec![0, 2, 1])));
        assert_eq!(attrs.get_as::<i64>("missing"), Ok(None));
    }

    #[test]
    fn test_type_mismatch() {
        let map = attr_map(&[
            ("axis", AttrValue::Float(1.0)),
            ("perm", AttrValue::List(vec![AttrValue::Int(0), AttrValue::Float(1.)])),
        ]);
        let attrs = Attrs::new(&map);

        assert_eq!(
            attrs.get_as::<i64>("axis"),
            Err(AttrError::TypeMismatch {
                attr: "axis".to_string(),
                expected: AttrKind::Int,
                actual: AttrKind::Float,
            })
        );

        // A list containing a non-int item cannot be decoded as a list of ints.
        let err = attrs.get_as::<Vec<i64>>("perm").err().unwrap();
        assert_eq!(
            err,
            AttrError::ListItemMismatch {
                attr: "perm".to_string(),
                index: 1,
                expected: AttrKind::Int,
                actual: AttrKind::Float,
            }
        );
        assert_eq!(
            err.to_string(),
            "item 1 of attribute \"perm\" should be int but is float"
        );
    }

    #[test]
    fn test_require() {
        let map = attr_map(&[("value", Value::from(Tensor::from_scalar(2.0f32)).into())]);
        let attrs = Attrs::new(&map);

        assert!(attrs.require::<&Value>("value").is_ok());
        assert_eq!(
            attrs.require::<i64>("axis"),
            Err(AttrError::Missing {
                attr: "axis".to_string()
            })
        );
    }

    #[test]
    fn test_unused() {
        let map = attr_map(&[
            ("axis", AttrValue::Int(0)),
            ("keepdims", AttrValue::Int(0)),
            ("select_last_index", AttrValue::Int(0)),
        ]);
        let attrs = Attrs::new(&map);
        assert_eq!(attrs.unused(), &["axis", "keepdims", "select_last_index"]);

        attrs.get_as::<i64>("axis").unwrap();
        attrs.get_as::<bool>("keepdims").unwrap();
        assert_eq!(attrs.unused(), &["select_last_index"]);
    }
}
