//! Host-side representations of values, releases and graph nodes.
//!
//! These are the types application code works with. The [proto](../proto/index.html) module holds
//! their wire counterparts, and [utilities::serial](../utilities/serial/index.html) converts between the two.

use crate::errors::*;
use crate::proto;

use indexmap::IndexMap;
use ndarray::ArrayD;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;


/// The primitive element types the wire format can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    I64,
    F64,
    Str,
}

/// Which variant of the wire Value a host value is (or should be) encoded as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueFormat {
    Array,
    Jagged,
    Indexmap,
}

impl ValueFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueFormat::Array => "array",
            ValueFormat::Jagged => "jagged",
            ValueFormat::Indexmap => "indexmap",
        }
    }
}

impl FromStr for ValueFormat {
    type Err = Error;

    fn from_str(format: &str) -> Result<ValueFormat> {
        match format {
            "array" => Ok(ValueFormat::Array),
            "jagged" => Ok(ValueFormat::Jagged),
            "indexmap" => Ok(ValueFormat::Indexmap),
            _ => Err(ErrorKind::InvalidFormat(format.to_string()).into())
        }
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// A host value.
///
/// Scalars and nested `List`s are the loose forms a host typically builds by hand.
/// `Array`, `Jagged` and `Indexmap` are the normalized forms produced by parsing a wire value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    List(Vec<Value>),
    Array(Array),
    Jagged(Jagged),
    Indexmap(IndexMap<IndexKey, Value>),
}

impl Value {
    /// Element type of a scalar, or None if the value is a container.
    pub fn scalar_data_type(&self) -> Option<DataType> {
        match self {
            Value::Bool(_) => Some(DataType::Bool),
            Value::I64(_) => Some(DataType::I64),
            Value::F64(_) => Some(DataType::F64),
            Value::Str(_) => Some(DataType::Str),
            _ => None
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.scalar_data_type().is_some()
    }
}

macro_rules! impl_value_from {
    ($($native:ty => $variant:ident),*) => {
        $(impl From<$native> for Value {
            fn from(value: $native) -> Self {
                Value::$variant(value.into())
            }
        })*
    }
}

impl_value_from!(
    bool => Bool, i32 => I64, i64 => I64, f64 => F64, String => Str, &str => Str,
    ArrayD<bool> => Array, ArrayD<i64> => Array, ArrayD<f64> => Array, ArrayD<String> => Array,
    Array => Array, Jagged => Jagged, IndexMap<IndexKey, Value> => Indexmap);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<IndexKey> for Value {
    fn from(key: IndexKey) -> Self {
        match key {
            IndexKey::Str(key) => Value::Str(key),
            IndexKey::I64(key) => Value::I64(key),
            IndexKey::Bool(key) => Value::Bool(key),
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Ok(match value {
            serde_json::Value::Null =>
                bail!(ErrorKind::UnsupportedValue("null has no value representation".to_string())),
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(integer) => Value::I64(integer),
                None => Value::F64(number.as_f64()
                    .ok_or_else(|| ErrorKind::UnsupportedValue(format!("number {} is out of range", number)))?)
            },
            serde_json::Value::String(value) => Value::Str(value),
            serde_json::Value::Array(values) => Value::List(values.into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<Value>>>()?),
            serde_json::Value::Object(object) => Value::Indexmap(object.into_iter()
                .map(|(key, value)| Ok((IndexKey::Str(key), Value::try_from(value)?)))
                .collect::<Result<IndexMap<IndexKey, Value>>>()?)
        })
    }
}


/// Dense N-dimensional array with a homogeneous element type.
#[derive(Clone, Debug, PartialEq)]
pub enum Array {
    Bool(ArrayD<bool>),
    I64(ArrayD<i64>),
    F64(ArrayD<f64>),
    Str(ArrayD<String>),
}

impl Array {
    pub fn shape(&self) -> &[usize] {
        match self {
            Array::Bool(array) => array.shape(),
            Array::I64(array) => array.shape(),
            Array::F64(array) => array.shape(),
            Array::Str(array) => array.shape(),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Array::Bool(_) => DataType::Bool,
            Array::I64(_) => DataType::I64,
            Array::F64(_) => DataType::F64,
            Array::Str(_) => DataType::Str,
        }
    }

    /// Nested lists of scalars, outermost axis first. A zero-dimensional array becomes its scalar.
    pub fn to_list(&self) -> Value {
        fn nest<T: Clone + Into<Value>>(array: &ArrayD<T>) -> Value {
            if array.ndim() == 0 {
                return array.iter().next().cloned().map(Into::into)
                    .unwrap_or_else(|| Value::List(Vec::new()));
            }
            Value::List(array.outer_iter()
                .map(|view| nest(&view.to_owned()))
                .collect())
        }
        match self {
            Array::Bool(array) => nest(array),
            Array::I64(array) => nest(array),
            Array::F64(array) => nest(array),
            Array::Str(array) => nest(array),
        }
    }
}

impl From<ArrayD<bool>> for Array {
    fn from(array: ArrayD<bool>) -> Self { Array::Bool(array) }
}

impl From<ArrayD<i64>> for Array {
    fn from(array: ArrayD<i64>) -> Self { Array::I64(array) }
}

impl From<ArrayD<f64>> for Array {
    fn from(array: ArrayD<f64>) -> Self { Array::F64(array) }
}

impl From<ArrayD<String>> for Array {
    fn from(array: ArrayD<String>) -> Self { Array::Str(array) }
}


/// Ragged sequence of independently sized columns sharing one element type.
#[derive(Clone, Debug, PartialEq)]
pub enum Jagged {
    Bool(Vec<Vec<bool>>),
    I64(Vec<Vec<i64>>),
    F64(Vec<Vec<f64>>),
    Str(Vec<Vec<String>>),
}

impl Jagged {
    pub fn data_type(&self) -> DataType {
        match self {
            Jagged::Bool(_) => DataType::Bool,
            Jagged::I64(_) => DataType::I64,
            Jagged::F64(_) => DataType::F64,
            Jagged::Str(_) => DataType::Str,
        }
    }
}


/// Flat buffer of one element type.
#[derive(Clone, Debug, PartialEq)]
pub enum Vector1D {
    Bool(Vec<bool>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Str(Vec<String>),
}

impl Vector1D {
    pub fn data_type(&self) -> DataType {
        match self {
            Vector1D::Bool(_) => DataType::Bool,
            Vector1D::I64(_) => DataType::I64,
            Vector1D::F64(_) => DataType::F64,
            Vector1D::Str(_) => DataType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Vector1D::Bool(vector) => vector.len(),
            Vector1D::I64(vector) => vector.len(),
            Vector1D::F64(vector) => vector.len(),
            Vector1D::Str(vector) => vector.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat buffer where any element may be missing.
#[derive(Clone, Debug, PartialEq)]
pub enum Vector1DNull {
    Bool(Vec<Option<bool>>),
    I64(Vec<Option<i64>>),
    F64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
}


/// Key of an indexmap. Floats and containers are not valid keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Str(String),
    I64(i64),
    Bool(bool),
}

impl TryFrom<Value> for IndexKey {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Str(key) => Ok(IndexKey::Str(key)),
            Value::I64(key) => Ok(IndexKey::I64(key)),
            Value::Bool(key) => Ok(IndexKey::Bool(key)),
            other => Err(ErrorKind::UnsupportedValue(format!(
                "index keys must be a string, integer or boolean, got {:?}", other)).into())
        }
    }
}

impl From<&str> for IndexKey {
    fn from(key: &str) -> Self { IndexKey::Str(key.to_string()) }
}

impl From<String> for IndexKey {
    fn from(key: String) -> Self { IndexKey::Str(key) }
}

impl From<i64> for IndexKey {
    fn from(key: i64) -> Self { IndexKey::I64(key) }
}

impl From<bool> for IndexKey {
    fn from(key: bool) -> Self { IndexKey::Bool(key) }
}


/// Privacy usage as a host describes it. A missing `delta` denotes pure usage.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PrivacyUsage {
    pub epsilon: f64,
    #[serde(default)]
    pub delta: Option<f64>,
}

/// A privacy usage in either host or wire form.
#[derive(Clone, Debug, PartialEq)]
pub enum Usage {
    Descriptor(PrivacyUsage),
    Wire(proto::PrivacyUsage),
}

impl From<PrivacyUsage> for Usage {
    fn from(usage: PrivacyUsage) -> Self { Usage::Descriptor(usage) }
}

impl From<proto::PrivacyUsage> for Usage {
    fn from(usage: proto::PrivacyUsage) -> Self { Usage::Wire(usage) }
}


/// The evaluation of one node in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ReleaseNode {
    pub value: Value,
    pub value_format: Option<ValueFormat>,
    pub public: bool,
    pub privacy_usages: Option<Vec<proto::PrivacyUsage>>,
}

impl ReleaseNode {
    pub fn new(value: Value) -> ReleaseNode {
        ReleaseNode {
            value,
            value_format: None,
            public: false,
            privacy_usages: None,
        }
    }
}

/// Evaluations keyed by graph id.
pub type Release = HashMap<u32, ReleaseNode>;


/// Reference to a component by its graph id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef(pub u32);

impl ComponentRef {
    pub fn component_id(&self) -> u32 {
        self.0
    }
}

/// A value bound to a parameter of a component constructor.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    None,
    Node(ComponentRef),
    Value(Value),
    Usages(Vec<Usage>),
}

macro_rules! impl_argument_from_value {
    ($($native:ty),*) => {
        $(impl From<$native> for Argument {
            fn from(value: $native) -> Self {
                Argument::Value(value.into())
            }
        })*
    }
}

impl_argument_from_value!(bool, i32, i64, f64, String, &str, Value, Array, Jagged,
    ArrayD<bool>, ArrayD<i64>, ArrayD<f64>, ArrayD<String>);

impl<T: Into<Value>> From<Vec<T>> for Argument {
    fn from(values: Vec<T>) -> Self {
        Argument::Value(values.into())
    }
}

impl From<ComponentRef> for Argument {
    fn from(component: ComponentRef) -> Self {
        Argument::Node(component)
    }
}

impl From<Option<ComponentRef>> for Argument {
    fn from(component: Option<ComponentRef>) -> Self {
        component.map(Argument::Node).unwrap_or(Argument::None)
    }
}

impl From<PrivacyUsage> for Argument {
    fn from(usage: PrivacyUsage) -> Self {
        Argument::Usages(vec![Usage::Descriptor(usage)])
    }
}

impl From<proto::PrivacyUsage> for Argument {
    fn from(usage: proto::PrivacyUsage) -> Self {
        Argument::Usages(vec![Usage::Wire(usage)])
    }
}

/// A literal option of a component.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Value(Value),
    PrivacyUsages(Vec<proto::PrivacyUsage>),
}

/// A node of the computation graph, as built by a component constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// engine operation identifier, resolved to a wire variant when serialized
    pub id: String,
    /// edges to other components; None entries are dropped on the wire
    pub arguments: IndexMap<String, Option<ComponentRef>>,
    pub options: IndexMap<String, Literal>,
    /// keyword arguments no parameter claimed, if the component accepts them as constraints
    pub constraints: Option<IndexMap<String, Argument>>,
    pub submission_id: u32,
}


/// How neighboring datasets are defined, and which engine protections are active.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PrivacyDefinition {
    pub group_size: u32,
    pub neighboring: String,
    pub strict_parameter_checks: bool,
    pub protect_overflow: bool,
    pub protect_elapsed_time: bool,
    pub protect_memory_utilization: bool,
    pub protect_floating_point: bool,
}

impl Default for PrivacyDefinition {
    fn default() -> Self {
        PrivacyDefinition {
            group_size: 1,
            neighboring: "substitute".to_string(),
            strict_parameter_checks: false,
            protect_overflow: true,
            protect_elapsed_time: false,
            protect_memory_utilization: true,
            protect_floating_point: true,
        }
    }
}

/// Settings of an analysis that are sent with every release request.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub privacy_definition: PrivacyDefinition,
    /// which evaluations the engine returns: "public", "public_and_private" or "all"
    pub filter_level: String,
    pub stack_trace: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            privacy_definition: PrivacyDefinition::default(),
            filter_level: "public".to_string(),
            stack_trace: true,
        }
    }
}

impl FromStr for AnalysisConfig {
    type Err = Error;

    fn from_str(text: &str) -> Result<AnalysisConfig> {
        Ok(serde_json::from_str(text)?)
    }
}


#[cfg(test)]
mod test_base {
    use crate::base::*;
    use crate::errors::ErrorKind;
    use ndarray::arr2;
    use std::convert::TryFrom;

    #[test]
    fn test_value_format_tokens() {
        assert_eq!("jagged".parse::<ValueFormat>().unwrap(), ValueFormat::Jagged);
        assert_eq!(ValueFormat::Indexmap.to_string(), "indexmap");
        match "tensor".parse::<ValueFormat>() {
            Err(err) => assert!(matches!(err.kind(), ErrorKind::InvalidFormat(_))),
            Ok(_) => panic!("tensor is not a value format")
        }
    }

    #[test]
    fn test_index_key_from_value() {
        assert_eq!(IndexKey::try_from(Value::from("a")).unwrap(), IndexKey::Str("a".to_string()));
        assert_eq!(IndexKey::try_from(Value::from(3)).unwrap(), IndexKey::I64(3));
        assert_eq!(IndexKey::try_from(Value::from(true)).unwrap(), IndexKey::Bool(true));
        assert!(IndexKey::try_from(Value::from(1.5)).is_err());
        assert!(IndexKey::try_from(Value::from(vec![1, 2])).is_err());
    }

    #[test]
    fn test_value_from_json() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": [1, 2.5], "b": "x"}"#).unwrap();
        let value = Value::try_from(json).unwrap();
        let mut expected = IndexMap::new();
        expected.insert(IndexKey::from("a"), Value::List(vec![Value::I64(1), Value::F64(2.5)]));
        expected.insert(IndexKey::from("b"), Value::from("x"));
        assert_eq!(value, Value::Indexmap(expected));

        assert!(Value::try_from(serde_json::Value::Null).is_err());
    }

    #[test]
    fn test_json_key_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mu": 3}"#).unwrap();
        match Value::try_from(json).unwrap() {
            Value::Indexmap(map) => assert_eq!(
                map.keys().cloned().collect::<Vec<IndexKey>>(),
                vec![IndexKey::from("zeta"), IndexKey::from("alpha"), IndexKey::from("mu")]),
            other => panic!("objects convert to maps, got {:?}", other)
        }
    }

    #[test]
    fn test_array_to_list() {
        let array = Array::I64(arr2(&[[1, 2], [3, 4]]).into_dyn());
        assert_eq!(array.to_list(), Value::from(vec![vec![1, 2], vec![3, 4]]));

        let scalar = Array::F64(ndarray::arr0(2.).into_dyn());
        assert_eq!(scalar.to_list(), Value::F64(2.));
    }

    #[test]
    fn test_config_defaults() {
        let config: AnalysisConfig = r#"{"privacy_definition": {"group_size": 2}}"#.parse().unwrap();
        assert_eq!(config.privacy_definition.group_size, 2);
        assert_eq!(config.privacy_definition.neighboring, "substitute");
        assert!(config.privacy_definition.protect_floating_point);
        assert_eq!(config.filter_level, "public");
    }
}
