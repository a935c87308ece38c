//! Declarative component schemas, and the id to wire variant lookup built from them.
//!
//! Each component is described by one JSON file under `prototypes/components`:
//!
//! ```json
//! {
//!   "id": "DPMean",
//!   "name": "dp_mean",
//!   "arguments": {"data": {"type": "ArrayND"}},
//!   "options": {"privacy_usage": {"type": "repeated PrivacyUsage"}},
//!   "return": {"type": "ArrayND"}
//! }
//! ```

use crate::errors::*;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::utilities::deduplicate;

/// Parameter name that accepts an open set of additional keyword arguments.
pub const CATCH_ALL: &str = "**kwargs";

/// Type of arguments that are serialized as jagged values.
pub const TYPE_JAGGED: &str = "Jagged";

/// Type of options that hold privacy usages.
pub const TYPE_PRIVACY_USAGE: &str = "repeated PrivacyUsage";


#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ComponentSchema {
    pub id: String,
    pub name: String,
    pub arguments: IndexMap<String, ParameterSchema>,
    pub options: IndexMap<String, ParameterSchema>,
    #[serde(rename(serialize = "return", deserialize = "return"))]
    pub arg_return: ParameterSchema,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// `Some(Null)` when the schema declares `"default": null`, `None` when there is no default
    #[serde(default, deserialize_with = "deserialize_some")]
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,
}

fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
    where T: Deserialize<'de>, D: Deserializer<'de> {
    T::deserialize(deserializer).map(Some)
}

/// Where keyword arguments that match no parameter are collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatchAll {
    /// extra graph edges
    Arguments,
    /// extra literal options
    Options,
    /// free-form constraints on the component
    Constraints,
}

impl ComponentSchema {
    pub fn catch_all(&self) -> CatchAll {
        if self.arguments.contains_key(CATCH_ALL) {
            CatchAll::Arguments
        } else if self.options.contains_key(CATCH_ALL) {
            CatchAll::Options
        } else {
            CatchAll::Constraints
        }
    }

    /// Names of all arguments and options, deduplicated in the order they are declared.
    pub fn parameters(&self) -> Vec<&str> {
        deduplicate(self.arguments.keys().chain(self.options.keys())
            .map(String::as_str)
            .filter(|name| *name != CATCH_ALL))
    }

    /// Schema of a parameter. Arguments take precedence over options of the same name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.arguments.get(name).or_else(|| self.options.get(name))
    }

    /// Parameter names in call order: those without a default, then those with a default.
    pub fn signature(&self) -> Vec<&str> {
        let (required, defaulted): (Vec<&str>, Vec<&str>) = self.parameters().into_iter()
            .partition(|name| self.parameter(name)
                .map(|parameter| parameter.default.is_none())
                .unwrap_or(true));
        required.into_iter().chain(defaulted).collect()
    }

    pub fn is_jagged(&self, argument: &str) -> bool {
        self.arguments.get(argument)
            .and_then(|parameter| parameter.kind.as_deref()) == Some(TYPE_JAGGED)
    }

    pub fn is_privacy_usage(&self, option: &str) -> bool {
        self.options.get(option)
            .and_then(|parameter| parameter.kind.as_deref()) == Some(TYPE_PRIVACY_USAGE)
    }

    fn validate(self) -> Result<Self> {
        if self.arguments.contains_key(CATCH_ALL) && self.options.contains_key(CATCH_ALL) {
            bail!(ErrorKind::MalformedSchema(format!(
                "{}: {} may be declared in the arguments or the options, not both", self.id, CATCH_ALL)))
        }
        Ok(self)
    }

    /// Read a schema from a JSON file. The path is named in any error.
    pub fn load(path: &Path) -> Result<ComponentSchema> {
        let source = || ErrorKind::MalformedSchema(path.display().to_string());
        fs::read_to_string(path).chain_err(source)?
            .parse::<ComponentSchema>().chain_err(source)
    }
}

impl FromStr for ComponentSchema {
    type Err = Error;

    fn from_str(text: &str) -> Result<ComponentSchema> {
        serde_json::from_str::<ComponentSchema>(text)?.validate()
    }
}

/// Load every `.json` schema in a directory, sorted by name.
///
/// One malformed schema fails the whole set.
pub fn load_schemas(dir: &Path) -> Result<Vec<ComponentSchema>> {
    let mut schemas = fs::read_dir(dir)
        .chain_err(|| ErrorKind::MalformedSchema(dir.display().to_string()))?
        // ignore invalid dirs
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension() == Some(OsStr::new("json")))
        .map(|entry| ComponentSchema::load(&entry.path()))
        .collect::<Result<Vec<ComponentSchema>>>()?;

    schemas.sort_by(|left, right| left.name.cmp(&right.name));
    debug!(dir = %dir.display(), count = schemas.len(), "loaded component schemas");
    Ok(schemas)
}


/// Maps each component id to the wire variant its options are serialized under.
///
/// Built once from the full schema set and read-only afterwards. Share it behind an `Arc`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantMessageMap(IndexMap<String, String>);

impl VariantMessageMap {
    pub fn from_schemas(schemas: &[ComponentSchema]) -> Result<VariantMessageMap> {
        let mut variants = IndexMap::new();
        for schema in schemas {
            if variants.insert(schema.id.clone(), schema.name.clone()).is_some() {
                bail!(ErrorKind::MalformedSchema(format!("{}: component id is declared twice", schema.id)))
            }
        }
        Ok(VariantMessageMap(variants))
    }

    pub fn get(&self, id: &str) -> Result<&str> {
        self.0.get(id)
            .map(String::as_str)
            .ok_or_else(|| ErrorKind::UnknownVariant(id.to_string()).into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn load(path: &Path) -> Result<VariantMessageMap> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl FromIterator<(String, String)> for VariantMessageMap {
    fn from_iter<I: IntoIterator<Item=(String, String)>>(iter: I) -> Self {
        VariantMessageMap(iter.into_iter().collect())
    }
}
