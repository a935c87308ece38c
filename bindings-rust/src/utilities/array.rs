use crate::errors::*;

use crate::base::{Array, DataType, Value, Vector1D};
use ndarray::{ArrayD, IxDyn};
use std::borrow::Cow;


/// Find the one element type that can hold both data types.
///
/// Integers widen to floats. Every other mismatch is an error.
pub fn unify_data_types(left: DataType, right: DataType) -> Result<DataType> {
    match (left, right) {
        (left, right) if left == right => Ok(left),
        (DataType::I64, DataType::F64) | (DataType::F64, DataType::I64) => Ok(DataType::F64),
        (left, right) => Err(ErrorKind::UnsupportedValue(format!(
            "elements must share one type, found both {:?} and {:?}", left, right)).into())
    }
}

/// Infer the data type of a sequence of scalars. An empty sequence is F64.
pub fn infer_data_type<'a>(elements: impl IntoIterator<Item=&'a Value>) -> Result<DataType> {
    let mut data_type: Option<DataType> = None;
    for element in elements {
        let element_type = element.scalar_data_type()
            .ok_or_else(|| ErrorKind::UnsupportedValue(format!("expected a scalar, got {:?}", element)))?;
        data_type = Some(match data_type {
            Some(data_type) => unify_data_types(data_type, element_type)?,
            None => element_type
        });
    }
    Ok(data_type.unwrap_or(DataType::F64))
}

/// Replace arrays nested inside lists with the equivalent nested lists, so they flatten like any other sequence.
pub fn expand_arrays(value: &Value) -> Cow<'_, Value> {
    fn contains_array(value: &Value) -> bool {
        match value {
            Value::Array(_) => true,
            Value::List(elements) => elements.iter().any(contains_array),
            _ => false
        }
    }
    fn expand(value: &Value) -> Value {
        match value {
            Value::Array(array) => array.to_list(),
            Value::List(elements) => Value::List(elements.iter().map(expand).collect()),
            other => other.clone()
        }
    }

    if contains_array(value) { Cow::Owned(expand(value)) } else { Cow::Borrowed(value) }
}

/// Collect the shape of a rectangular nested sequence, and its scalars in row-major order.
///
/// A scalar has an empty shape. Ragged nesting is rejected.
pub fn flatten(value: &Value) -> Result<(Vec<usize>, Vec<&Value>)> {
    // the first element at each depth determines the expected shape
    let mut shape = Vec::new();
    let mut cursor = value;
    while let Value::List(elements) = cursor {
        shape.push(elements.len());
        match elements.first() {
            Some(first) => cursor = first,
            None => break
        }
    }

    fn walk<'a>(value: &'a Value, shape: &[usize], depth: usize, leaves: &mut Vec<&'a Value>) -> Result<()> {
        if depth == shape.len() {
            if !value.is_scalar() {
                bail!(ErrorKind::UnsupportedValue(format!(
                    "nested sequence is not rectangular at depth {}; use the jagged format for ragged data", depth)))
            }
            leaves.push(value);
            return Ok(());
        }
        match value {
            Value::List(elements) if elements.len() == shape[depth] => elements.iter()
                .try_for_each(|element| walk(element, shape, depth + 1, leaves)),
            _ => Err(ErrorKind::UnsupportedValue(format!(
                "nested sequence is not rectangular at depth {}; use the jagged format for ragged data", depth)).into())
        }
    }

    let mut leaves = Vec::with_capacity(shape.iter().product());
    walk(value, &shape, 0, &mut leaves)?;
    Ok((shape, leaves))
}

/// Copy scalars into a flat buffer of the given data type.
pub fn to_vector1d(elements: &[&Value], data_type: DataType) -> Result<Vector1D> {
    fn mismatch(element: &Value, data_type: DataType) -> Error {
        ErrorKind::UnsupportedValue(format!("{:?} is not of type {:?}", element, data_type)).into()
    }

    Ok(match data_type {
        DataType::Bool => Vector1D::Bool(elements.iter()
            .map(|element| match element {
                Value::Bool(value) => Ok(*value),
                other => Err(mismatch(other, data_type))
            }).collect::<Result<_>>()?),
        DataType::I64 => Vector1D::I64(elements.iter()
            .map(|element| match element {
                Value::I64(value) => Ok(*value),
                other => Err(mismatch(other, data_type))
            }).collect::<Result<_>>()?),
        DataType::F64 => Vector1D::F64(elements.iter()
            .map(|element| match element {
                Value::F64(value) => Ok(*value),
                Value::I64(value) => Ok(*value as f64),
                other => Err(mismatch(other, data_type))
            }).collect::<Result<_>>()?),
        DataType::Str => Vector1D::Str(elements.iter()
            .map(|element| match element {
                Value::Str(value) => Ok(value.clone()),
                other => Err(mismatch(other, data_type))
            }).collect::<Result<_>>()?),
    })
}

/// Flatten an array in row-major order.
pub fn array_to_vector1d(array: &Array) -> (Vec<usize>, Vector1D) {
    let shape = array.shape().to_vec();
    let vector = match array {
        Array::Bool(array) => Vector1D::Bool(array.iter().copied().collect()),
        Array::I64(array) => Vector1D::I64(array.iter().copied().collect()),
        Array::F64(array) => Vector1D::F64(array.iter().copied().collect()),
        Array::Str(array) => Vector1D::Str(array.iter().cloned().collect()),
    };
    (shape, vector)
}

/// Reshape a flat buffer into an array.
pub fn vector1d_to_array(shape: &[usize], vector: Vector1D) -> Result<Array> {
    let shape = IxDyn(shape);
    Ok(match vector {
        Vector1D::Bool(vector) => Array::Bool(ArrayD::from_shape_vec(shape, vector)?),
        Vector1D::I64(vector) => Array::I64(ArrayD::from_shape_vec(shape, vector)?),
        Vector1D::F64(vector) => Array::F64(ArrayD::from_shape_vec(shape, vector)?),
        Vector1D::Str(vector) => Array::Str(ArrayD::from_shape_vec(shape, vector)?),
    })
}

/// The single element of a buffer, as a scalar.
pub fn vector1d_to_scalar(vector: Vector1D) -> Result<Value> {
    if vector.len() != 1 {
        bail!(ErrorKind::UnsupportedValue(format!(
            "a scalar must hold exactly one element, found {}", vector.len())))
    }
    Ok(match vector {
        Vector1D::Bool(mut vector) => Value::Bool(vector.remove(0)),
        Vector1D::I64(mut vector) => Value::I64(vector.remove(0)),
        Vector1D::F64(mut vector) => Value::F64(vector.remove(0)),
        Vector1D::Str(mut vector) => Value::Str(vector.remove(0)),
    })
}
