use std::collections::BTreeSet;
use std::iter::FromIterator;

use heck::KebabCase;

use crate::schema::{ComponentSchema, ParameterSchema, CATCH_ALL};

/// Note appended to every docstring about the catch-all keyword arguments.
pub const KWARGS_NOTE: &str = "clamp by min, max, categories, etc by passing parameters of the form [argument]_[bound]=x";

fn document_parameter(prefix: &str, name: &str, parameter: &ParameterSchema) -> String {
    format!("{}{}: {}", prefix, name, parameter.description.as_deref().unwrap_or(""))
}

/// Human readable description of a component constructor.
pub fn docstring(schema: &ComponentSchema) -> String {
    let mut docstring = format!("{} Component", schema.id);
    if let Some(description) = &schema.description {
        docstring.push_str(&format!("\n\n{}\n", description));
    }

    schema.arguments.iter().chain(schema.options.iter())
        .for_each(|(name, parameter)| {
            docstring.push('\n');
            docstring.push_str(&document_parameter(":param ", name, parameter));
        });

    docstring.push_str(&format!("\n:param kwargs: {}", KWARGS_NOTE));
    docstring.push('\n');
    docstring.push_str(&document_parameter(":return", "", &schema.arg_return));
    docstring
}

/// The constructor's call signature, with defaults rendered as JSON.
pub fn signature(schema: &ComponentSchema) -> String {
    let parameters = schema.signature().into_iter()
        .map(|name| match schema.parameter(name).and_then(|parameter| parameter.default.as_ref()) {
            Some(default) => format!("{}={}", name, default),
            None => name.to_string()
        })
        .chain(std::iter::once(CATCH_ALL.to_string()))
        .collect::<Vec<String>>();

    format!("{}({})", schema.name, parameters.join(", "))
}

/// Markdown reference of all components: a summary table, then one section per component.
pub fn build_documentation(schemas: &[ComponentSchema]) -> String {
    let header = r#"# Components

All of the components available in the bindings are listed below.
The components may be strung together in arbitrary directed graphs (called analyses), and submitted to the engine for release.

| Component ID | Bindings Name | Inputs |
|--------------|---------------|--------|"#.to_string();

    let table = schemas.iter()
        .map(|schema| {
            let inputs = BTreeSet::from_iter(schema.parameters()).iter()
                .map(|v| format!("`{}`", v))
                .collect::<Vec<String>>().join(", ");

            format!("| [{id}](#{anchor}) | {name} | {inputs} |",
                    id = schema.id,
                    anchor = schema.id.to_kebab_case(),
                    name = schema.name,
                    inputs = inputs)
        })
        .collect::<Vec<String>>().join("\n");

    let sections = schemas.iter()
        .map(|schema| format!("## {id}\n\n```text\n{signature}\n```\n\n```text\n{docstring}\n```\n",
                              id = schema.id,
                              signature = signature(schema),
                              docstring = docstring(schema)))
        .collect::<Vec<String>>().join("\n");

    format!("{}\n{}\n\n{}", header, table, sections)
}


#[cfg(test)]
mod test_documentation {
    use crate::documentation::*;
    use crate::schema::ComponentSchema;

    fn dp_mean() -> ComponentSchema {
        r#"{
            "id": "DPMean",
            "name": "dp_mean",
            "description": "Differentially private mean.",
            "arguments": {
                "data": {"type": "ArrayND", "description": "data to aggregate"}
            },
            "options": {
                "mechanism": {"type": "string", "default": "Automatic"},
                "privacy_usage": {"type": "repeated PrivacyUsage", "description": "budget"}
            },
            "return": {"type": "ArrayND", "description": "the mean"}
        }"#.parse().unwrap()
    }

    #[test]
    fn test_docstring() {
        let expected = "DPMean Component\n\nDifferentially private mean.\n\n\
            :param data: data to aggregate\n\
            :param mechanism: \n\
            :param privacy_usage: budget\n\
            :param kwargs: clamp by min, max, categories, etc by passing parameters of the form [argument]_[bound]=x\n\
            :return: the mean";
        assert_eq!(docstring(&dp_mean()), expected);
    }

    #[test]
    fn test_signature() {
        assert_eq!(signature(&dp_mean()), r#"dp_mean(data, privacy_usage, mechanism="Automatic", **kwargs)"#);
    }

    #[test]
    fn test_table() {
        let documentation = build_documentation(&[dp_mean()]);
        assert!(documentation.contains("| [DPMean](#dp-mean) | dp_mean | `data`, `mechanism`, `privacy_usage` |"));
        assert!(documentation.contains("## DPMean"));
    }
}
