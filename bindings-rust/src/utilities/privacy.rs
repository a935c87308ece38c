//! Conversion between host privacy usage descriptors and the wire PrivacyUsage.

use crate::errors::*;

use crate::base::{Argument, IndexKey, PrivacyUsage, Usage, Value};
use crate::proto;


/// Normalize privacy usages into their wire form.
///
/// Descriptors without a delta become pure usages. A delta of any value, zero included, makes the usage approximate.
/// Wire usages pass through untouched.
pub fn serialize_privacy_usage(usages: Vec<Usage>) -> Vec<proto::PrivacyUsage> {
    usages.into_iter().map(serialize_usage).collect()
}

pub fn serialize_usage(usage: Usage) -> proto::PrivacyUsage {
    use proto::privacy_usage::{Distance, DistanceApproximate, DistancePure};

    match usage {
        Usage::Wire(usage) => usage,
        Usage::Descriptor(PrivacyUsage { epsilon, delta: None }) => proto::PrivacyUsage {
            distance: Some(Distance::Pure(DistancePure { epsilon }))
        },
        Usage::Descriptor(PrivacyUsage { epsilon, delta: Some(delta) }) => proto::PrivacyUsage {
            distance: Some(Distance::Approximate(DistanceApproximate { epsilon, delta }))
        }
    }
}

/// Convert a privacy usage back into a host descriptor.
///
/// Only approximate usages are understood. Pure usages are rejected rather than reinterpreted,
/// and descriptors are returned as-is.
pub fn parse_privacy_usage(usage: Usage) -> Result<PrivacyUsage> {
    use proto::privacy_usage::Distance;

    match usage {
        Usage::Descriptor(usage) => Ok(usage),
        Usage::Wire(usage) => match usage.distance {
            Some(Distance::Approximate(approximate)) => Ok(PrivacyUsage {
                epsilon: approximate.epsilon,
                delta: Some(approximate.delta),
            }),
            Some(Distance::Pure(_)) =>
                Err(ErrorKind::UnsupportedPrivacyVariant("pure".to_string()).into()),
            None =>
                Err(ErrorKind::UnsupportedPrivacyVariant("unset".to_string()).into()),
        }
    }
}

/// Read privacy usages out of a host value.
///
/// The value is either a map with an `epsilon` and optional `delta`, or a list of such maps.
pub fn usages_from_value(value: &Value) -> Result<Vec<Usage>> {
    match value {
        Value::List(usages) => usages.iter()
            .map(usage_from_value)
            .collect(),
        usage => Ok(vec![usage_from_value(usage)?])
    }
}

fn usage_from_value(value: &Value) -> Result<Usage> {
    fn as_f64(value: &Value, name: &str) -> Result<f64> {
        match value {
            Value::F64(value) => Ok(*value),
            Value::I64(value) => Ok(*value as f64),
            other => Err(ErrorKind::UnsupportedValue(format!("{} must be numeric, got {:?}", name, other)).into())
        }
    }

    let descriptor = match value {
        Value::Indexmap(descriptor) => descriptor,
        other => bail!(ErrorKind::UnsupportedValue(format!(
            "a privacy usage must be a map of epsilon and delta, got {:?}", other)))
    };

    let epsilon = descriptor.get(&IndexKey::from("epsilon"))
        .ok_or_else(|| ErrorKind::UnsupportedValue("a privacy usage must define epsilon".to_string()))?;

    Ok(Usage::Descriptor(PrivacyUsage {
        epsilon: as_f64(epsilon, "epsilon")?,
        delta: descriptor.get(&IndexKey::from("delta"))
            .map(|delta| as_f64(delta, "delta"))
            .transpose()?,
    }))
}

/// Read privacy usages out of an argument bound to a component constructor.
pub fn usages_from_argument(argument: Argument) -> Result<Vec<Usage>> {
    match argument {
        Argument::None => Ok(Vec::new()),
        Argument::Usages(usages) => Ok(usages),
        Argument::Value(value) => usages_from_value(&value),
        Argument::Node(node) => Err(ErrorKind::UnsupportedValue(format!(
            "a privacy usage must be a literal, got a reference to component {}", node.component_id())).into())
    }
}
