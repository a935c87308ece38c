//! Serialization and deserialization between prost protobuf structs and host representations

use crate::errors::*;

use crate::base::{Component, DataType, IndexKey, Jagged, Literal, PrivacyDefinition, Release, ReleaseNode, Value, ValueFormat, Vector1D, Vector1DNull};
use crate::bindings::Analysis;
use crate::proto;
use crate::schema::VariantMessageMap;
use crate::utilities::array::{array_to_vector1d, expand_arrays, flatten, infer_data_type, to_vector1d, vector1d_to_array, vector1d_to_scalar};

use heck::ShoutySnakeCase;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, trace};


// PARSERS
pub fn parse_bool_null(value: proto::BoolNull) -> Option<bool> {
    value.data.map(|proto::bool_null::Data::Option(x)| x)
}

pub fn parse_i64_null(value: proto::I64Null) -> Option<i64> {
    value.data.map(|proto::i64_null::Data::Option(x)| x)
}

pub fn parse_f64_null(value: proto::F64Null) -> Option<f64> {
    value.data.map(|proto::f64_null::Data::Option(x)| x)
}

pub fn parse_str_null(value: proto::StrNull) -> Option<String> {
    value.data.map(|proto::str_null::Data::Option(x)| x)
}

pub fn parse_array1d_null(value: proto::Array1dNull) -> Result<Vector1DNull> {
    use proto::array1d_null::Data;

    Ok(match value.data.ok_or("array1d data must be defined")? {
        Data::Bool(vector) => Vector1DNull::Bool(vector.data.into_iter().map(parse_bool_null).collect()),
        Data::I64(vector) => Vector1DNull::I64(vector.data.into_iter().map(parse_i64_null).collect()),
        Data::F64(vector) => Vector1DNull::F64(vector.data.into_iter().map(parse_f64_null).collect()),
        Data::String(vector) => Vector1DNull::Str(vector.data.into_iter().map(parse_str_null).collect()),
    })
}

pub fn parse_array1d(value: proto::Array1d) -> Result<Vector1D> {
    use proto::array1d::Data;

    Ok(match value.data.ok_or("array1d data must be defined")? {
        Data::Bool(vector) => Vector1D::Bool(vector.data),
        Data::I64(vector) => Vector1D::I64(vector.data),
        Data::F64(vector) => Vector1D::F64(vector.data),
        Data::String(vector) => Vector1D::Str(vector.data),
    })
}

pub fn parse_data_type(value: proto::DataType) -> Result<DataType> {
    Ok(match value {
        proto::DataType::Unknown => bail!("data type must be known"),
        proto::DataType::Bool => DataType::Bool,
        proto::DataType::I64 => DataType::I64,
        proto::DataType::F64 => DataType::F64,
        proto::DataType::String => DataType::Str,
    })
}

pub fn parse_index_key(value: proto::IndexKey) -> Result<IndexKey> {
    use proto::index_key::Key;

    Ok(match value.key.ok_or_else(|| ErrorKind::UnsupportedValue("index key may not be empty".to_string()))? {
        Key::Str(key) => IndexKey::Str(key),
        Key::I64(key) => IndexKey::I64(key),
        Key::Bool(key) => IndexKey::Bool(key),
    })
}

/// Parse an array. An empty shape yields the single scalar element, not a one-element array.
pub fn parse_array(value: proto::Array) -> Result<Value> {
    let vector = parse_array1d(value.flattened.ok_or("array must contain a flattened buffer")?)?;
    if value.shape.is_empty() {
        return vector1d_to_scalar(vector);
    }
    let shape = value.shape.into_iter().map(|length| length as usize).collect::<Vec<usize>>();
    Ok(Value::Array(vector1d_to_array(&shape, vector)?))
}

/// Parse a jagged value, checking that every column holds the declared data type.
///
/// Columns with no populated buffer are empty.
pub fn parse_jagged(value: proto::Jagged) -> Result<Jagged> {
    let data_type = parse_data_type(proto::DataType::from_i32(value.data_type)
        .ok_or_else(|| Error::from(format!("unrecognized data type {}", value.data_type)))?)?;

    let columns = value.data.into_iter()
        .map(|column| match column.data {
            Some(_) => parse_array1d(column),
            None => Ok(empty_vector1d(data_type))
        })
        .collect::<Result<Vec<Vector1D>>>()?;

    let mismatch = |column: Vector1D| -> Error {
        format!("jagged column holds {:?} data, but the declared data type is {:?}", column.data_type(), data_type).into()
    };

    Ok(match data_type {
        DataType::Bool => Jagged::Bool(columns.into_iter()
            .map(|column| match column {
                Vector1D::Bool(column) => Ok(column),
                other => Err(mismatch(other))
            }).collect::<Result<_>>()?),
        DataType::I64 => Jagged::I64(columns.into_iter()
            .map(|column| match column {
                Vector1D::I64(column) => Ok(column),
                other => Err(mismatch(other))
            }).collect::<Result<_>>()?),
        DataType::F64 => Jagged::F64(columns.into_iter()
            .map(|column| match column {
                Vector1D::F64(column) => Ok(column),
                other => Err(mismatch(other))
            }).collect::<Result<_>>()?),
        DataType::Str => Jagged::Str(columns.into_iter()
            .map(|column| match column {
                Vector1D::Str(column) => Ok(column),
                other => Err(mismatch(other))
            }).collect::<Result<_>>()?),
    })
}

pub fn parse_indexmap(value: proto::Indexmap) -> Result<IndexMap<IndexKey, Value>> {
    let proto::Indexmap { keys, values } = value;
    if keys.len() != values.len() {
        bail!("indexmap has {} keys but {} values", keys.len(), values.len())
    }
    keys.into_iter().zip(values)
        .map(|(key, value)| Ok((parse_index_key(key)?, parse_value(value)?)))
        .collect()
}

/// The format of a wire value, read from whichever variant is populated.
pub fn value_format(value: &proto::Value) -> Option<ValueFormat> {
    use proto::value::Data;

    value.data.as_ref().map(|data| match data {
        Data::Array(_) => ValueFormat::Array,
        Data::Jagged(_) => ValueFormat::Jagged,
        Data::Indexmap(_) => ValueFormat::Indexmap,
    })
}

pub fn parse_value(value: proto::Value) -> Result<Value> {
    use proto::value::Data;

    Ok(match value.data.ok_or("value data must be defined")? {
        Data::Array(data) => parse_array(data)?,
        Data::Jagged(data) => Value::Jagged(parse_jagged(data)?),
        Data::Indexmap(data) => Value::Indexmap(parse_indexmap(data)?),
    })
}

pub fn parse_release(release: proto::Release) -> Result<Release> {
    release.values.into_iter()
        .map(|(node_id, release_node)| Ok((node_id, parse_release_node(release_node)
            .chain_err(|| format!("at node_id {:?}", node_id))?)))
        .collect()
}

/// Parse one evaluation. Privacy usages are only kept when there are some.
pub fn parse_release_node(release_node: proto::ReleaseNode) -> Result<ReleaseNode> {
    let value = release_node.value.ok_or("release node value must be defined")?;
    let value_format = value_format(&value);

    Ok(ReleaseNode {
        value: parse_value(value)?,
        value_format,
        public: release_node.public,
        privacy_usages: release_node.privacy_usages
            .map(|usages| usages.values)
            .filter(|usages| !usages.is_empty()),
    })
}


// SERIALIZERS
pub fn serialize_bool_null(value: Option<bool>) -> proto::BoolNull {
    proto::BoolNull { data: value.map(proto::bool_null::Data::Option) }
}

pub fn serialize_i64_null(value: Option<i64>) -> proto::I64Null {
    proto::I64Null { data: value.map(proto::i64_null::Data::Option) }
}

pub fn serialize_f64_null(value: Option<f64>) -> proto::F64Null {
    proto::F64Null { data: value.map(proto::f64_null::Data::Option) }
}

pub fn serialize_str_null(value: Option<String>) -> proto::StrNull {
    proto::StrNull { data: value.map(proto::str_null::Data::Option) }
}

pub fn serialize_array1d_null(value: Vector1DNull) -> proto::Array1dNull {
    use proto::array1d_null::Data;

    proto::Array1dNull {
        data: Some(match value {
            Vector1DNull::Bool(vector) => Data::Bool(proto::Array1dBoolNull {
                data: vector.into_iter().map(serialize_bool_null).collect()
            }),
            Vector1DNull::I64(vector) => Data::I64(proto::Array1dI64Null {
                data: vector.into_iter().map(serialize_i64_null).collect()
            }),
            Vector1DNull::F64(vector) => Data::F64(proto::Array1dF64Null {
                data: vector.into_iter().map(serialize_f64_null).collect()
            }),
            Vector1DNull::Str(vector) => Data::String(proto::Array1dStrNull {
                data: vector.into_iter().map(serialize_str_null).collect()
            }),
        })
    }
}

pub fn serialize_array1d(value: Vector1D) -> proto::Array1d {
    use proto::array1d::Data;

    proto::Array1d {
        data: Some(match value {
            Vector1D::Bool(data) => Data::Bool(proto::Array1dBool { data }),
            Vector1D::I64(data) => Data::I64(proto::Array1dI64 { data }),
            Vector1D::F64(data) => Data::F64(proto::Array1dF64 { data }),
            Vector1D::Str(data) => Data::String(proto::Array1dStr { data }),
        })
    }
}

pub fn serialize_data_type(value: DataType) -> proto::DataType {
    match value {
        DataType::Bool => proto::DataType::Bool,
        DataType::I64 => proto::DataType::I64,
        DataType::F64 => proto::DataType::F64,
        DataType::Str => proto::DataType::String,
    }
}

pub fn serialize_index_key(key: IndexKey) -> proto::IndexKey {
    use proto::index_key::Key;

    proto::IndexKey {
        key: Some(match key {
            IndexKey::Str(key) => Key::Str(key),
            IndexKey::I64(key) => Key::I64(key),
            IndexKey::Bool(key) => Key::Bool(key),
        })
    }
}

/// Serialize a scalar, rectangular nested list or array as a dense array.
pub fn serialize_array(value: &Value) -> Result<proto::Array> {
    let (shape, vector) = match value {
        Value::Array(array) => array_to_vector1d(array),
        Value::Jagged(_) | Value::Indexmap(_) => bail!(ErrorKind::UnsupportedValue(
            "only scalars, nested lists and arrays can be serialized as an array".to_string())),
        value => {
            let value = expand_arrays(value);
            let (shape, elements) = flatten(&value)?;
            let data_type = infer_data_type(elements.iter().copied())?;
            (shape, to_vector1d(&elements, data_type)?)
        }
    };

    Ok(proto::Array {
        flattened: Some(serialize_array1d(vector)),
        shape: shape.into_iter().map(|length| length as u64).collect(),
    })
}

/// Serialize a value as a list of columns.
///
/// Values that aren't already a list of columns are wrapped: a flat list becomes one column, and a scalar
/// becomes one column of one element. The element type is unified across all columns, so columns of different
/// non-numeric types are rejected, and empty columns take on the type of the others.
pub fn serialize_jagged(value: &Value) -> Result<proto::Jagged> {
    let (data_type, columns) = match value {
        Value::Jagged(jagged) => (jagged.data_type(), jagged_to_columns(jagged)),
        value => {
            let columns = normalize_columns(value)?;
            let data_type = infer_data_type(columns.iter().flatten())?;
            let columns = columns.iter()
                .map(|column| to_vector1d(&column.iter().collect::<Vec<&Value>>(), data_type))
                .collect::<Result<Vec<Vector1D>>>()?;
            (data_type, columns)
        }
    };
    trace!(data_type = ?data_type, columns = columns.len(), "serializing jagged value");

    Ok(proto::Jagged {
        data: columns.into_iter().map(serialize_array1d).collect(),
        data_type: serialize_data_type(data_type) as i32,
    })
}

fn normalize_columns(value: &Value) -> Result<Vec<Vec<Value>>> {
    let elements = match value {
        Value::List(elements) => elements.clone(),
        Value::Array(array) => match array.to_list() {
            Value::List(elements) => elements,
            scalar => vec![scalar]
        },
        Value::Indexmap(_) | Value::Jagged(_) => bail!(ErrorKind::UnsupportedValue(
            "only scalars, lists and arrays can be serialized as a jagged value".to_string())),
        scalar => vec![scalar.clone()]
    };

    if !elements.iter().any(|element| matches!(element, Value::List(_) | Value::Array(_))) {
        return Ok(vec![elements]);
    }

    Ok(elements.into_iter()
        .map(|element| match element {
            Value::List(column) => column,
            Value::Array(array) => match array.to_list() {
                Value::List(column) => column,
                scalar => vec![scalar]
            },
            scalar => vec![scalar]
        })
        .collect())
}

fn jagged_to_columns(jagged: &Jagged) -> Vec<Vector1D> {
    match jagged {
        Jagged::Bool(columns) => columns.iter().cloned().map(Vector1D::Bool).collect(),
        Jagged::I64(columns) => columns.iter().cloned().map(Vector1D::I64).collect(),
        Jagged::F64(columns) => columns.iter().cloned().map(Vector1D::F64).collect(),
        Jagged::Str(columns) => columns.iter().cloned().map(Vector1D::Str).collect(),
    }
}

fn empty_vector1d(data_type: DataType) -> Vector1D {
    match data_type {
        DataType::Bool => Vector1D::Bool(Vec::new()),
        DataType::I64 => Vector1D::I64(Vec::new()),
        DataType::F64 => Vector1D::F64(Vec::new()),
        DataType::Str => Vector1D::Str(Vec::new()),
    }
}

pub fn serialize_indexmap(value: &IndexMap<IndexKey, Value>) -> Result<proto::Indexmap> {
    Ok(proto::Indexmap {
        keys: value.keys().cloned().map(serialize_index_key).collect(),
        values: value.values()
            .map(|value| serialize_value(value, None))
            .collect::<Result<Vec<proto::Value>>>()?,
    })
}

/// Serialize a host value.
///
/// Without a format, ordered maps become indexmaps, jagged values stay jagged, and everything else is
/// serialized as an array. Maps are always serialized as indexmaps.
pub fn serialize_value(value: &Value, value_format: Option<ValueFormat>) -> Result<proto::Value> {
    use proto::value::Data;

    Ok(proto::Value {
        data: Some(match (value_format, value) {
            (_, Value::Indexmap(indexmap)) =>
                Data::Indexmap(serialize_indexmap(indexmap)?),
            (Some(ValueFormat::Indexmap), _) => bail!(ErrorKind::UnsupportedValue(
                "only ordered maps can be serialized as an indexmap".to_string())),
            (Some(ValueFormat::Jagged), _) =>
                Data::Jagged(serialize_jagged(value)?),
            (None, Value::Jagged(_)) =>
                Data::Jagged(serialize_jagged(value)?),
            (_, _) =>
                Data::Array(serialize_array(value)?)
        })
    })
}

pub fn serialize_release(release: &Release) -> Result<proto::Release> {
    Ok(proto::Release {
        values: release.iter()
            .map(|(node_id, release_node)| Ok((*node_id, serialize_release_node(release_node)
                .chain_err(|| format!("at node_id {:?}", node_id))?)))
            .collect::<Result<HashMap<u32, proto::ReleaseNode>>>()?
    })
}

pub fn serialize_release_node(release_node: &ReleaseNode) -> Result<proto::ReleaseNode> {
    Ok(proto::ReleaseNode {
        value: Some(serialize_value(&release_node.value, release_node.value_format)?),
        privacy_usages: release_node.privacy_usages.clone()
            .map(|values| proto::PrivacyUsages { values }),
        public: release_node.public,
    })
}

pub fn serialize_neighboring(neighboring: &str) -> Result<proto::privacy_definition::Neighboring> {
    use proto::privacy_definition::Neighboring;

    match neighboring.to_shouty_snake_case().as_str() {
        "SUBSTITUTE" => Ok(Neighboring::Substitute),
        "ADD_REMOVE" => Ok(Neighboring::AddRemove),
        _ => Err(ErrorKind::UnknownEnumToken("Neighboring".to_string(), neighboring.to_string()).into())
    }
}

pub fn serialize_filter_level(filter_level: &str) -> Result<proto::FilterLevel> {
    match filter_level.to_shouty_snake_case().as_str() {
        "PUBLIC" => Ok(proto::FilterLevel::Public),
        "PUBLIC_AND_PRIVATE" => Ok(proto::FilterLevel::PublicAndPrivate),
        "ALL" => Ok(proto::FilterLevel::All),
        _ => Err(ErrorKind::UnknownEnumToken("FilterLevel".to_string(), filter_level.to_string()).into())
    }
}

pub fn serialize_privacy_definition(privacy_definition: &PrivacyDefinition) -> Result<proto::PrivacyDefinition> {
    Ok(proto::PrivacyDefinition {
        group_size: privacy_definition.group_size,
        neighboring: serialize_neighboring(&privacy_definition.neighboring)? as i32,
        strict_parameter_checks: privacy_definition.strict_parameter_checks,
        protect_overflow: privacy_definition.protect_overflow,
        protect_elapsed_time: privacy_definition.protect_elapsed_time,
        protect_memory_utilization: privacy_definition.protect_memory_utilization,
        protect_floating_point: privacy_definition.protect_floating_point,
    })
}

pub fn serialize_component_option(option: &Literal) -> Result<proto::ComponentOption> {
    use proto::component_option::Data;

    Ok(proto::ComponentOption {
        data: Some(match option {
            Literal::Value(value) => Data::Value(serialize_value(value, None)?),
            Literal::PrivacyUsages(values) => Data::PrivacyUsages(proto::PrivacyUsages { values: values.clone() }),
        })
    })
}

/// Serialize a component.
///
/// Arguments are serialized as the graph ids of the components they reference, and null arguments are dropped.
/// The options populate the one wire variant registered for the component's id.
pub fn serialize_component(
    component: &Component,
    variants: &VariantMessageMap,
) -> Result<proto::Component> {
    // resolve the variant before building anything
    let name = variants.get(&component.id)?;

    let (keys, values): (Vec<proto::IndexKey>, Vec<u32>) = component.arguments.iter()
        .filter_map(|(name, argument)| argument
            .map(|argument| (serialize_index_key(IndexKey::Str(name.clone())), argument.component_id())))
        .unzip();

    Ok(proto::Component {
        arguments: Some(proto::IndexmapNodeIds { keys, values }),
        submission: component.submission_id,
        variant: Some(proto::ComponentVariant {
            name: name.to_string(),
            id: component.id.clone(),
            options: Some(proto::ComponentOptions {
                keys: component.options.keys().cloned().collect(),
                values: component.options.iter()
                    .map(|(name, option)| serialize_component_option(option)
                        .chain_err(|| format!("in option {:?} of {}", name, component.id)))
                    .collect::<Result<Vec<proto::ComponentOption>>>()?,
            }),
        }),
    })
}

pub fn serialize_analysis(analysis: &Analysis) -> Result<proto::Analysis> {
    let graph = analysis.components.iter()
        .map(|(component_id, component)| Ok((*component_id, serialize_component(
            component, analysis.variant_message_map())
            .chain_err(|| format!("at node_id {:?}", component_id))?)))
        .collect::<Result<HashMap<u32, proto::Component>>>()?;
    debug!(components = graph.len(), "serialized analysis");

    Ok(proto::Analysis {
        computation_graph: Some(proto::ComputationGraph { value: graph }),
        privacy_definition: Some(serialize_privacy_definition(&analysis.config.privacy_definition)?),
    })
}


#[cfg(test)]
mod test_serial {
    use crate::base::*;
    use crate::bindings::Analysis;
    use crate::errors::ErrorKind;
    use crate::proto;
    use crate::schema::VariantMessageMap;
    use crate::utilities::serial::*;

    use indexmap::IndexMap;
    use ndarray::{arr1, arr2};
    use prost::Message;
    use std::iter::FromIterator;
    use std::sync::Arc;

    fn round_trip(value: &Value, value_format: Option<ValueFormat>) -> Value {
        parse_value(serialize_value(value, value_format).unwrap()).unwrap()
    }

    #[test]
    fn test_scalar() {
        for value in vec![Value::from(true), Value::from(3), Value::from(2.5), Value::from("a")] {
            let serialized = serialize_value(&value, None).unwrap();
            match &serialized.data {
                Some(proto::value::Data::Array(array)) => assert!(array.shape.is_empty()),
                _ => panic!("scalars serialize to arrays")
            }
            assert_eq!(parse_value(serialized).unwrap(), value);
        }
    }

    #[test]
    fn test_array() {
        let array = Value::from(arr2(&[[1, 2, 3], [4, 5, 6]]).into_dyn());
        assert_eq!(round_trip(&array, None), array);
        assert_eq!(round_trip(&array, Some(ValueFormat::Array)), array);

        let strings = Value::from(arr1(&["a".to_string(), "b".to_string()]).into_dyn());
        assert_eq!(round_trip(&strings, None), strings);

        // nested lists come back as arrays of the same shape
        let nested = Value::from(vec![vec![true, false], vec![false, true]]);
        assert_eq!(
            round_trip(&nested, None),
            Value::from(arr2(&[[true, false], [false, true]]).into_dyn()));

        let mixed = Value::List(vec![Value::I64(1), Value::F64(0.5)]);
        assert_eq!(round_trip(&mixed, None), Value::from(arr1(&[1., 0.5]).into_dyn()));

        let empty = Value::List(vec![]);
        assert_eq!(round_trip(&empty, None), Value::from(arr1::<f64>(&[]).into_dyn()));

        // a list of arrays stacks into one array
        let rows = Value::List(vec![
            Value::Array(Array::F64(arr1(&[1., 2.]).into_dyn())),
            Value::Array(Array::F64(arr1(&[3., 4.]).into_dyn())),
        ]);
        assert_eq!(round_trip(&rows, None), Value::from(arr2(&[[1., 2.], [3., 4.]]).into_dyn()));
    }

    #[test]
    fn test_array_rejections() {
        let heterogeneous = Value::List(vec![Value::from(1), Value::from("b")]);
        match serialize_value(&heterogeneous, None) {
            Err(err) => assert!(matches!(err.kind(), ErrorKind::UnsupportedValue(_))),
            Ok(_) => panic!("heterogeneous arrays are not serializable")
        }
        assert!(serialize_value(&Value::from(vec![vec![1, 2], vec![3]]), None).is_err());
        assert!(serialize_value(&Value::from(vec![true]), Some(ValueFormat::Indexmap)).is_err());
    }

    #[test]
    fn test_jagged() {
        let columns = Value::from(vec![vec![1, 2, 3], vec![], vec![4]]);
        let serialized = serialize_value(&columns, Some(ValueFormat::Jagged)).unwrap();
        if let Some(proto::value::Data::Jagged(jagged)) = &serialized.data {
            assert_eq!(jagged.data_type, proto::DataType::I64 as i32);
            assert_eq!(jagged.data.len(), 3);
        } else {
            panic!("expected a jagged value")
        }
        assert_eq!(
            parse_value(serialized).unwrap(),
            Value::Jagged(Jagged::I64(vec![vec![1, 2, 3], vec![], vec![4]])));

        let jagged = Value::Jagged(Jagged::Str(vec![vec!["a".to_string()], vec![]]));
        assert_eq!(round_trip(&jagged, None), jagged);
    }

    #[test]
    fn test_jagged_normalization() {
        assert_eq!(
            round_trip(&Value::from(2.), Some(ValueFormat::Jagged)),
            Value::Jagged(Jagged::F64(vec![vec![2.]])));
        assert_eq!(
            round_trip(&Value::from(vec!["a", "b"]), Some(ValueFormat::Jagged)),
            Value::Jagged(Jagged::Str(vec![vec!["a".to_string(), "b".to_string()]])));
        assert_eq!(
            round_trip(&Value::List(vec![Value::from(vec![1, 2]), Value::from(3)]), Some(ValueFormat::Jagged)),
            Value::Jagged(Jagged::I64(vec![vec![1, 2], vec![3]])));
        assert_eq!(
            round_trip(&Value::from(arr1(&[true, false]).into_dyn()), Some(ValueFormat::Jagged)),
            Value::Jagged(Jagged::Bool(vec![vec![true, false]])));
    }

    #[test]
    fn test_jagged_column_types() {
        // columns of different element types are rejected rather than mislabeled
        let columns = Value::List(vec![Value::from(vec![1, 2]), Value::from(vec!["a"])]);
        assert!(serialize_value(&columns, Some(ValueFormat::Jagged)).is_err());

        let mislabeled = proto::Value {
            data: Some(proto::value::Data::Jagged(proto::Jagged {
                data: vec![
                    serialize_array1d(Vector1D::I64(vec![1])),
                    serialize_array1d(Vector1D::Str(vec!["a".to_string()])),
                ],
                data_type: proto::DataType::I64 as i32,
            }))
        };
        assert!(parse_value(mislabeled).is_err());
    }

    #[test]
    fn test_indexmap() {
        let mut inner = IndexMap::new();
        inner.insert(IndexKey::from(true), Value::from(vec![1., 2.]));
        let mut indexmap = IndexMap::new();
        indexmap.insert(IndexKey::from("z"), Value::from(arr1(&[3, 4]).into_dyn()));
        indexmap.insert(IndexKey::from(7i64), Value::Indexmap(inner));
        indexmap.insert(IndexKey::from("a"), Value::Jagged(Jagged::I64(vec![vec![1], vec![]])));
        indexmap.insert(IndexKey::from(false), Value::from("x"));

        match round_trip(&Value::Indexmap(indexmap.clone()), Some(ValueFormat::Indexmap)) {
            Value::Indexmap(parsed) => {
                assert_eq!(parsed.keys().collect::<Vec<_>>(), indexmap.keys().collect::<Vec<_>>());
                assert_eq!(parsed[&IndexKey::from("z")], indexmap[&IndexKey::from("z")]);
                assert_eq!(parsed[&IndexKey::from("a")], indexmap[&IndexKey::from("a")]);
                assert_eq!(parsed[&IndexKey::from(false)], Value::from("x"));
                match &parsed[&IndexKey::from(7i64)] {
                    Value::Indexmap(inner) => assert_eq!(
                        inner[&IndexKey::from(true)],
                        Value::from(arr1(&[1., 2.]).into_dyn())),
                    other => panic!("expected a nested indexmap, got {:?}", other)
                }
            }
            other => panic!("expected an indexmap, got {:?}", other)
        }
    }

    #[test]
    fn test_empty_index_key() {
        let indexmap = proto::Indexmap {
            keys: vec![proto::IndexKey { key: None }],
            values: vec![serialize_value(&Value::from(1), None).unwrap()],
        };
        let value = proto::Value { data: Some(proto::value::Data::Indexmap(indexmap)) };
        match parse_value(value) {
            Err(err) => assert!(matches!(err.kind(), ErrorKind::UnsupportedValue(_))),
            Ok(_) => panic!("empty index keys are invalid")
        }
    }

    #[test]
    fn test_wire_bytes() {
        let value = Value::from(vec![vec![1.5, 2.5], vec![3.5, 4.5]]);
        let serialized = serialize_value(&value, None).unwrap();
        let mut buffer = Vec::new();
        serialized.encode(&mut buffer).unwrap();

        let decoded = proto::Value::decode(&buffer[..]).unwrap();
        assert_eq!(decoded, serialized);
        assert_eq!(value_format(&decoded), Some(ValueFormat::Array));
        assert_eq!(
            parse_value(decoded).unwrap(),
            Value::from(arr2(&[[1.5, 2.5], [3.5, 4.5]]).into_dyn()));
    }

    #[test]
    fn test_array1d_null() {
        let vector = Vector1DNull::I64(vec![Some(1), None, Some(3)]);
        assert_eq!(parse_array1d_null(serialize_array1d_null(vector.clone())).unwrap(), vector);

        let vector = Vector1DNull::Str(vec![None, Some("a".to_string())]);
        assert_eq!(parse_array1d_null(serialize_array1d_null(vector.clone())).unwrap(), vector);
    }

    #[test]
    fn test_release() {
        let usage = proto::PrivacyUsage {
            distance: Some(proto::privacy_usage::Distance::Approximate(
                proto::privacy_usage::DistanceApproximate { epsilon: 0.5, delta: 0. }))
        };

        let mut release = Release::new();
        release.insert(1, ReleaseNode {
            value: Value::Jagged(Jagged::F64(vec![vec![1.], vec![2., 3.]])),
            value_format: Some(ValueFormat::Jagged),
            public: true,
            privacy_usages: None,
        });
        release.insert(2, ReleaseNode {
            value: Value::from(4.),
            value_format: None,
            public: false,
            privacy_usages: Some(vec![usage.clone()]),
        });
        release.insert(3, ReleaseNode {
            value: Value::from(5),
            value_format: Some(ValueFormat::Array),
            public: true,
            privacy_usages: Some(vec![]),
        });

        let parsed = parse_release(serialize_release(&release).unwrap()).unwrap();
        assert_eq!(parsed[&1], release[&1]);
        assert_eq!(parsed[&2].value_format, Some(ValueFormat::Array));
        assert_eq!(parsed[&2].privacy_usages, Some(vec![usage]));
        assert!(!parsed[&2].public);
        // empty usages are not carried into the parsed release
        assert_eq!(parsed[&3].privacy_usages, None);
    }

    #[test]
    fn test_privacy_definition() {
        let definition = PrivacyDefinition {
            neighboring: "add_remove".to_string(),
            ..PrivacyDefinition::default()
        };
        let serialized = serialize_privacy_definition(&definition).unwrap();
        assert_eq!(serialized.neighboring, proto::privacy_definition::Neighboring::AddRemove as i32);
        assert_eq!(serialized.group_size, 1);
        assert!(serialized.protect_overflow);
        assert!(!serialized.protect_elapsed_time);

        let unknown = PrivacyDefinition {
            neighboring: "unknownmode".to_string(),
            ..PrivacyDefinition::default()
        };
        match serialize_privacy_definition(&unknown) {
            Err(err) => assert!(matches!(err.kind(), ErrorKind::UnknownEnumToken(_, _))),
            Ok(_) => panic!("unknownmode is not a neighboring relation")
        }

        assert_eq!(serialize_filter_level("public_and_private").unwrap(), proto::FilterLevel::PublicAndPrivate);
        assert!(serialize_filter_level("some").is_err());
    }

    #[test]
    fn test_component() {
        let variants = VariantMessageMap::from_iter(vec![("X".to_string(), "x_variant".to_string())]);

        let mut arguments = IndexMap::new();
        arguments.insert("a".to_string(), Some(ComponentRef(4)));
        arguments.insert("b".to_string(), None);
        let mut options = IndexMap::new();
        options.insert("k".to_string(), Literal::Value(Value::from(5)));

        let component = Component {
            id: "X".to_string(),
            arguments,
            options,
            constraints: None,
            submission_id: 2,
        };

        let serialized = serialize_component(&component, &variants).unwrap();
        let edges = serialized.arguments.unwrap();
        assert_eq!(edges.keys, vec![serialize_index_key(IndexKey::from("a"))]);
        assert_eq!(edges.values, vec![4]);
        assert_eq!(serialized.submission, 2);

        let variant = serialized.variant.unwrap();
        assert_eq!(variant.name, "x_variant");
        assert_eq!(variant.id, "X");
        let options = variant.options.unwrap();
        assert_eq!(options.keys, vec!["k".to_string()]);
        assert_eq!(options.values, vec![proto::ComponentOption {
            data: Some(proto::component_option::Data::Value(serialize_value(&Value::from(5), None).unwrap()))
        }]);

        let unregistered = Component { id: "Y".to_string(), ..component };
        match serialize_component(&unregistered, &variants) {
            Err(err) => assert!(matches!(err.kind(), ErrorKind::UnknownVariant(_))),
            Ok(_) => panic!("Y has no registered variant")
        }
    }

    #[test]
    fn test_analysis() {
        let variants = Arc::new(VariantMessageMap::from_iter(vec![
            ("Literal".to_string(), "literal".to_string())
        ]));
        let mut analysis = Analysis::new(variants.clone(), AnalysisConfig::default());
        analysis.literal(Value::from(1.), None);

        let serialized = serialize_analysis(&analysis).unwrap();
        assert_eq!(serialized.computation_graph.unwrap().value.len(), 1);
        assert_eq!(serialized.privacy_definition.unwrap().neighboring,
                   proto::privacy_definition::Neighboring::Substitute as i32);

        let mut config = AnalysisConfig::default();
        config.privacy_definition.neighboring = "unknownmode".to_string();
        let analysis = Analysis::new(variants, config);
        assert!(serialize_analysis(&analysis).is_err());
    }
}
