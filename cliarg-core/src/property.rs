//! Field access for specification targets.
//!
//! A [`FieldAccessor`] reads and writes one field of a target type through a
//! `serde_json::Value`, which is the interchange form produced by the coercion
//! chain. Accessors are registered explicitly per field, usually through the
//! [`property!`](crate::property!) macro.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoerceError;

/// Declared type of a parameter, as far as coercion cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Integer,
    Unsigned,
    Float,
    /// `f32`; values outside its range are rejected
    Float32,
    Char,
    /// Plain text; also used for enums and other types serde reads from a string
    String,
    /// Lists and sets, with the element type
    Sequence(Box<ValueType>),
    /// Maps with the value type of their entries
    Map(Box<ValueType>),
    /// Nested structs and maps of unknown value type
    Mapping,
}

impl ValueType {
    pub fn sequence_of(element: ValueType) -> Self {
        ValueType::Sequence(Box::new(element))
    }

    pub fn map_of(value: ValueType) -> Self {
        ValueType::Map(Box::new(value))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ValueType::Bool)
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, ValueType::Sequence(_))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Unsigned => write!(f, "unsigned integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::Float32 => write!(f, "32-bit float"),
            ValueType::Char => write!(f, "char"),
            ValueType::String => write!(f, "string"),
            ValueType::Sequence(element) => write!(f, "sequence of {}", element),
            ValueType::Map(value) => write!(f, "mapping of {}", value),
            ValueType::Mapping => write!(f, "mapping"),
        }
    }
}

/// Maps a Rust field type to its [`ValueType`].
///
/// Implemented for the common std types. Enums that serde reads from their
/// variant name implement it with [`ValueType::String`]; structs use
/// [`ValueType::Mapping`]. Maps take their value type from `V`, so a map of
/// structs needs `V: ArgType` or an explicit `property!(T, field as ..)`.
pub trait ArgType {
    fn value_type() -> ValueType;
}

macro_rules! arg_type {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(impl ArgType for $ty {
            fn value_type() -> ValueType {
                $kind
            }
        })+
    };
}

arg_type!(ValueType::Bool => bool);
arg_type!(ValueType::Integer => i8, i16, i32, i64, isize);
arg_type!(ValueType::Unsigned => u8, u16, u32, u64, usize);
arg_type!(ValueType::Float32 => f32);
arg_type!(ValueType::Float => f64);
arg_type!(ValueType::Char => char);
arg_type!(ValueType::String => String, PathBuf);

impl<T: ArgType> ArgType for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }
}

impl<T: ArgType> ArgType for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::sequence_of(T::value_type())
    }
}

impl<T: ArgType> ArgType for VecDeque<T> {
    fn value_type() -> ValueType {
        ValueType::sequence_of(T::value_type())
    }
}

impl<T: ArgType, S> ArgType for HashSet<T, S> {
    fn value_type() -> ValueType {
        ValueType::sequence_of(T::value_type())
    }
}

impl<T: ArgType> ArgType for BTreeSet<T> {
    fn value_type() -> ValueType {
        ValueType::sequence_of(T::value_type())
    }
}

impl<K, V: ArgType, S> ArgType for HashMap<K, V, S> {
    fn value_type() -> ValueType {
        ValueType::map_of(V::value_type())
    }
}

impl<K, V: ArgType> ArgType for BTreeMap<K, V> {
    fn value_type() -> ValueType {
        ValueType::map_of(V::value_type())
    }
}

/// Get/set capability for one field of `T`.
pub trait FieldAccessor<T>: Send + Sync {
    /// Declared type of the field
    fn value_type(&self) -> &ValueType;

    /// Current value of the field
    fn get(&self, target: &T) -> Result<Value, CoerceError>;

    /// Replace the field with `value`; the field is untouched on error
    fn set(&self, target: &mut T, value: Value) -> Result<(), CoerceError>;
}

type Getter<T, F> = Box<dyn Fn(&T) -> &F + Send + Sync>;
type MutGetter<T, F> = Box<dyn Fn(&mut T) -> &mut F + Send + Sync>;

/// [`FieldAccessor`] built from a pair of projection closures.
pub struct Property<T, F> {
    value_type: ValueType,
    get: Getter<T, F>,
    get_mut: MutGetter<T, F>,
}

impl<T, F> Property<T, F> {
    /// Accessor whose declared type comes from [`ArgType`].
    pub fn new<G, M>(get: G, get_mut: M) -> Self
    where
        F: ArgType,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        Self::typed(F::value_type(), get, get_mut)
    }

    /// Accessor with an explicit declared type.
    pub fn typed<G, M>(value_type: ValueType, get: G, get_mut: M) -> Self
    where
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        Self {
            value_type,
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        }
    }
}

impl<T, F> FieldAccessor<T> for Property<T, F>
where
    F: Serialize + DeserializeOwned,
{
    fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    fn get(&self, target: &T) -> Result<Value, CoerceError> {
        serde_json::to_value((self.get)(target)).map_err(CoerceError::Snapshot)
    }

    fn set(&self, target: &mut T, value: Value) -> Result<(), CoerceError> {
        let typed: F = serde_json::from_value(value).map_err(CoerceError::Assign)?;
        *(self.get_mut)(target) = typed;
        Ok(())
    }
}

impl<T, F> fmt::Debug for Property<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}

/// Builds a [`Property`] for a named field of a target struct.
///
/// ```
/// # use cliarg_core::property;
/// #[derive(Default)]
/// struct Job { retries: u32 }
///
/// let retries = property!(Job, retries);
/// ```
#[macro_export]
macro_rules! property {
    ($target:ty, $field:ident) => {
        $crate::Property::new(
            |target: &$target| &target.$field,
            |target: &mut $target| &mut target.$field,
        )
    };
    ($target:ty, $field:ident as $value_type:expr) => {
        $crate::Property::typed(
            $value_type,
            |target: &$target| &target.$field,
            |target: &mut $target| &mut target.$field,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Sample {
        count: u8,
        name: Option<String>,
        tags: Vec<String>,
    }

    #[test]
    fn test_value_types_from_std() {
        assert_eq!(<bool as ArgType>::value_type(), ValueType::Bool);
        assert_eq!(<i32 as ArgType>::value_type(), ValueType::Integer);
        assert_eq!(<usize as ArgType>::value_type(), ValueType::Unsigned);
        assert_eq!(<Option<f64> as ArgType>::value_type(), ValueType::Float);
        assert_eq!(
            <Vec<Vec<u8>> as ArgType>::value_type(),
            ValueType::sequence_of(ValueType::sequence_of(ValueType::Unsigned))
        );
        assert_eq!(
            <HashMap<String, i32> as ArgType>::value_type(),
            ValueType::map_of(ValueType::Integer)
        );
        assert_eq!(<f32 as ArgType>::value_type(), ValueType::Float32);
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueType::sequence_of(ValueType::Integer).to_string(), "sequence of integer");
        assert_eq!(ValueType::Unsigned.to_string(), "unsigned integer");
    }

    #[test]
    fn test_property_get_set() {
        let count = property!(Sample, count);
        let name = property!(Sample, name);
        let tags = property!(Sample, tags);
        let mut sample = Sample::default();

        count.set(&mut sample, json!(7)).unwrap();
        name.set(&mut sample, json!("bob")).unwrap();
        tags.set(&mut sample, json!(["a", "b"])).unwrap();

        assert_eq!(sample.count, 7);
        assert_eq!(sample.name.as_deref(), Some("bob"));
        assert_eq!(tags.get(&sample).unwrap(), json!(["a", "b"]));
        assert_eq!(count.value_type(), &ValueType::Unsigned);
    }

    #[test]
    fn test_property_set_out_of_range_leaves_field() {
        let count = property!(Sample, count);
        let mut sample = Sample {
            count: 3,
            ..Default::default()
        };

        let err = count.set(&mut sample, json!(300)).unwrap_err();
        assert!(matches!(err, CoerceError::Assign(_)));
        assert_eq!(sample.count, 3);
    }

    #[test]
    fn test_typed_property_overrides_declared_type() {
        let name = property!(Sample, name as ValueType::Mapping);
        assert_eq!(name.value_type(), &ValueType::Mapping);
    }
}
