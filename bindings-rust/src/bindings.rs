//! Constructors for building analyses, generated from component schemas.
//!
//! A [ComponentFactory](struct.ComponentFactory.html) is built for each schema. Calling it with a
//! [Call](struct.Call.html) binds positional and keyword arguments against the schema's signature,
//! adds the resulting component to the [Analysis](struct.Analysis.html), and returns a reference to it.
//! Host values passed where an edge is expected become `Literal` components whose values are held in the
//! analysis's release.
//!
//! # Example
//! ```
//! use smartnoise_bindings::{Bindings, Call};
//! use smartnoise_bindings::base::{AnalysisConfig, PrivacyUsage, Value};
//! use std::path::PathBuf;
//!
//! let schemas = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("prototypes").join("components");
//! let bindings = Bindings::from_dir(&schemas).unwrap();
//! let mut analysis = bindings.analysis(AnalysisConfig::default());
//!
//! let data = analysis.literal(Value::from(vec![1., 2., 3.]), None);
//! let clamped = bindings.call(&mut analysis, "clamp", Call::new()
//!     .arg(data)
//!     .kwarg("lower", 0.)
//!     .kwarg("upper", 10.)).unwrap();
//! bindings.call(&mut analysis, "dp_mean", Call::new()
//!     .arg(clamped)
//!     .kwarg("privacy_usage", PrivacyUsage { epsilon: 1., delta: None })).unwrap();
//!
//! let request = smartnoise_bindings::serialize_analysis(&analysis).unwrap();
//! assert_eq!(request.computation_graph.unwrap().value.len(), 5);
//! ```

use crate::errors::*;

use crate::base::{AnalysisConfig, Argument, Component, ComponentRef, Literal, Release, ReleaseNode, Value, ValueFormat};
use crate::documentation::{build_documentation, docstring, signature};
use crate::engine::{execute_release, Engine};
use crate::schema::{load_schemas, CatchAll, ComponentSchema, ParameterSchema, VariantMessageMap, CATCH_ALL};
use crate::utilities::prepend;
use crate::utilities::privacy::{serialize_privacy_usage, usages_from_argument};

use indexmap::IndexMap;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Component id of graph nodes that hold a host value.
pub const LITERAL: &str = "Literal";


/// A computation graph under construction, and the values already known for its nodes.
#[derive(Debug)]
pub struct Analysis {
    pub components: IndexMap<u32, Component>,
    pub release: Release,
    pub config: AnalysisConfig,
    pub component_count: u32,
    pub submission_count: u32,
    variants: Arc<VariantMessageMap>,
}

impl Analysis {
    pub fn new(variants: Arc<VariantMessageMap>, config: AnalysisConfig) -> Self {
        Analysis {
            components: IndexMap::new(),
            release: Release::new(),
            config,
            component_count: 0,
            submission_count: 0,
            variants,
        }
    }

    pub fn variant_message_map(&self) -> &VariantMessageMap {
        &self.variants
    }

    /// Add a component to the graph under the next free id.
    pub fn add_component(&mut self, component: Component) -> ComponentRef {
        self.component_count += 1;
        debug!(component_id = self.component_count, id = %component.id, "adding component");
        self.components.insert(self.component_count, component);
        ComponentRef(self.component_count)
    }

    /// Add a public `Literal` component holding a host value.
    pub fn literal(&mut self, value: Value, value_format: Option<ValueFormat>) -> ComponentRef {
        let reference = self.add_component(Component {
            id: LITERAL.to_string(),
            arguments: IndexMap::new(),
            options: IndexMap::new(),
            constraints: None,
            submission_id: self.submission_count,
        });
        self.release.insert(reference.component_id(), ReleaseNode {
            value,
            value_format,
            public: true,
            privacy_usages: None,
        });
        reference
    }

    /// Resolve an argument to an edge, creating a literal for host values.
    pub fn component_of(
        &mut self, argument: Argument, value_format: Option<ValueFormat>,
    ) -> Result<Option<ComponentRef>> {
        match argument {
            Argument::None => Ok(None),
            Argument::Node(reference) => if self.components.contains_key(&reference.component_id()) {
                Ok(Some(reference))
            } else {
                bail!(ErrorKind::UnsupportedValue(format!(
                    "component {} is not part of this analysis", reference.component_id())))
            },
            Argument::Value(value) => Ok(Some(self.literal(value, value_format))),
            Argument::Usages(_) => bail!(ErrorKind::UnsupportedValue(
                "privacy usages cannot be used as a graph edge".to_string())),
        }
    }

    /// Drop every component added after `component_count` reached `checkpoint`, along with its released value.
    fn rollback(&mut self, checkpoint: u32) {
        for component_id in (checkpoint + 1)..=self.component_count {
            self.components.shift_remove(&component_id);
            self.release.remove(&component_id);
        }
        debug!(removed = self.component_count - checkpoint, "rolled back components");
        self.component_count = checkpoint;
    }

    /// Submit the analysis to the engine, and merge the engine's release into this analysis.
    pub fn release(&mut self, engine: &dyn Engine) -> Result<&Release> {
        let release = execute_release(engine, self)?;
        self.release.extend(release);
        self.submission_count += 1;
        Ok(&self.release)
    }
}


/// Arguments to a component constructor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    pub positional: Vec<Argument>,
    pub keywords: IndexMap<String, Argument>,
}

impl Call {
    pub fn new() -> Self {
        Call::default()
    }

    pub fn arg(mut self, argument: impl Into<Argument>) -> Self {
        self.positional.push(argument.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, argument: impl Into<Argument>) -> Self {
        self.keywords.insert(name.into(), argument.into());
        self
    }
}


/// Constructor for one kind of component.
#[derive(Clone, Debug)]
pub struct ComponentFactory {
    schema: ComponentSchema,
    signature: Vec<String>,
    catch_all: CatchAll,
}

impl ComponentFactory {
    pub fn new(schema: ComponentSchema) -> Self {
        ComponentFactory {
            signature: schema.signature().into_iter().map(String::from).collect(),
            catch_all: schema.catch_all(),
            schema,
        }
    }

    pub fn id(&self) -> &str {
        &self.schema.id
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &ComponentSchema {
        &self.schema
    }

    /// Parameter names in the order positional arguments are bound.
    pub fn parameters(&self) -> &[String] {
        &self.signature
    }

    pub fn signature(&self) -> String {
        signature(&self.schema)
    }

    pub fn docstring(&self) -> String {
        docstring(&self.schema)
    }

    fn invalid_call(&self, message: String) -> Error {
        ErrorKind::InvalidCall(self.schema.name.clone(), message).into()
    }

    fn is_required(&self, name: &str) -> bool {
        self.schema.parameter(name)
            .map(|parameter| parameter.default.is_none())
            .unwrap_or(true)
    }

    /// Match the call against the signature. Keywords that match no parameter are returned separately.
    fn bind(&self, call: Call) -> Result<(IndexMap<String, Argument>, IndexMap<String, Argument>)> {
        let Call { positional, keywords } = call;

        if positional.len() > self.signature.len() {
            return Err(self.invalid_call(format!(
                "takes {} positional arguments but {} were given", self.signature.len(), positional.len())));
        }

        let mut bound = self.signature.iter().cloned()
            .zip(positional)
            .collect::<IndexMap<String, Argument>>();

        let mut residual = IndexMap::new();
        for (name, argument) in keywords {
            if !self.signature.contains(&name) {
                residual.insert(name, argument);
            } else if bound.contains_key(&name) {
                return Err(self.invalid_call(format!("got multiple values for argument {:?}", name)));
            } else {
                bound.insert(name, argument);
            }
        }

        let missing = self.signature.iter()
            .filter(|name| !bound.contains_key(*name) && self.is_required(name))
            .map(|name| format!("{:?}", name))
            .collect::<Vec<String>>();
        if !missing.is_empty() {
            return Err(self.invalid_call(format!("missing required arguments: {}", missing.join(", "))));
        }

        Ok((bound, residual))
    }

    /// The argument bound to a parameter, or the parameter's default.
    fn bound_argument(
        &self, name: &str, parameter: &ParameterSchema, bound: &IndexMap<String, Argument>,
    ) -> Result<Argument> {
        if let Some(argument) = bound.get(name) {
            return Ok(argument.clone());
        }
        Ok(match &parameter.default {
            None | Some(serde_json::Value::Null) => Argument::None,
            Some(default) => Argument::Value(Value::try_from(default.clone())
                .chain_err(|| ErrorKind::MalformedSchema(format!("{}: default of {}", self.schema.id, name)))?)
        })
    }

    fn literal_of(&self, name: &str, argument: Argument) -> Result<Option<Literal>> {
        Ok(match argument {
            Argument::None => None,
            Argument::Value(value) => Some(Literal::Value(value)),
            Argument::Usages(usages) => Some(Literal::PrivacyUsages(serialize_privacy_usage(usages))),
            Argument::Node(_) => return Err(self.invalid_call(format!(
                "option {:?} must be a literal, not a component", name)))
        })
    }

    /// Build a component from the call and add it to the analysis.
    ///
    /// A call that fails leaves the analysis as it was, including any literals created for its arguments.
    pub fn call(&self, analysis: &mut Analysis, call: Call) -> Result<ComponentRef> {
        let checkpoint = analysis.component_count;
        let component = self.build(analysis, call);
        if component.is_err() {
            analysis.rollback(checkpoint);
        }
        component
    }

    fn build(&self, analysis: &mut Analysis, call: Call) -> Result<ComponentRef> {
        let (bound, mut residual) = self.bind(call)?;

        let mut arguments = IndexMap::new();
        if self.catch_all == CatchAll::Arguments {
            for (name, argument) in residual.drain(..) {
                let reference = analysis.component_of(argument, None)
                    .map_err(prepend(&format!("{}:", name)))?;
                arguments.insert(name, reference);
            }
        }
        for (name, parameter) in self.schema.arguments.iter().filter(|(name, _)| *name != CATCH_ALL) {
            let value_format = if self.schema.is_jagged(name) { Some(ValueFormat::Jagged) } else { None };
            let argument = self.bound_argument(name, parameter, &bound)?;
            let reference = analysis.component_of(argument, value_format)
                .map_err(prepend(&format!("{}:", name)))?;
            arguments.insert(name.clone(), reference);
        }

        let mut options = IndexMap::new();
        if self.catch_all == CatchAll::Options {
            for (name, argument) in residual.drain(..) {
                if let Some(literal) = self.literal_of(&name, argument)? {
                    options.insert(name, literal);
                }
            }
        }
        for (name, parameter) in self.schema.options.iter().filter(|(name, _)| *name != CATCH_ALL) {
            let argument = self.bound_argument(name, parameter, &bound)?;
            if self.schema.is_privacy_usage(name) {
                let usages = usages_from_argument(argument)
                    .map_err(prepend(&format!("{}:", name)))?;
                options.insert(name.clone(), Literal::PrivacyUsages(serialize_privacy_usage(usages)));
            } else if let Some(literal) = self.literal_of(name, argument)? {
                options.insert(name.clone(), literal);
            }
        }

        let constraints = match self.catch_all {
            CatchAll::Constraints => Some(residual),
            _ => None
        };

        Ok(analysis.add_component(Component {
            id: self.schema.id.clone(),
            arguments,
            options,
            constraints,
            submission_id: analysis.submission_count,
        }))
    }
}


/// Component constructors for a full schema set, and the variant lookup they share.
#[derive(Clone, Debug)]
pub struct Bindings {
    factories: IndexMap<String, ComponentFactory>,
    variants: Arc<VariantMessageMap>,
}

impl Bindings {
    pub fn from_schemas(schemas: Vec<ComponentSchema>) -> Result<Bindings> {
        // the lookup is complete before any constructor exists
        let variants = Arc::new(VariantMessageMap::from_schemas(&schemas)?);
        let factories = schemas.into_iter()
            .map(|schema| (schema.name.clone(), ComponentFactory::new(schema)))
            .collect::<IndexMap<String, ComponentFactory>>();
        debug!(components = factories.len(), "built component constructors");

        Ok(Bindings { factories, variants })
    }

    pub fn from_dir(dir: &Path) -> Result<Bindings> {
        Bindings::from_schemas(load_schemas(dir)?)
    }

    /// Look up a constructor by its bindings name or its component id.
    pub fn factory(&self, name: &str) -> Result<&ComponentFactory> {
        self.factories.get(name)
            .or_else(|| self.factories.values().find(|factory| factory.id() == name))
            .ok_or_else(|| ErrorKind::UnknownVariant(name.to_string()).into())
    }

    pub fn factories(&self) -> impl Iterator<Item=&ComponentFactory> + '_ {
        self.factories.values()
    }

    pub fn call(&self, analysis: &mut Analysis, name: &str, call: Call) -> Result<ComponentRef> {
        self.factory(name)?.call(analysis, call)
    }

    pub fn variant_message_map(&self) -> Arc<VariantMessageMap> {
        self.variants.clone()
    }

    /// Start an empty analysis that shares this schema set's variant lookup.
    pub fn analysis(&self, config: AnalysisConfig) -> Analysis {
        Analysis::new(self.variants.clone(), config)
    }

    pub fn documentation(&self) -> String {
        build_documentation(&self.factories.values()
            .map(|factory| factory.schema.clone())
            .collect::<Vec<ComponentSchema>>())
    }

    /// Write `variant_message_map.json` and `components.md` into a directory.
    pub fn write_artifacts(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        self.variants.write(&dir.join("variant_message_map.json"))?;
        fs::write(dir.join("components.md"), self.documentation())?;
        debug!(dir = %dir.display(), "wrote bindings artifacts");
        Ok(())
    }
}
