//! Boundary layer between host applications and the SmartNoise wire format.
//!
//! A host builds a computation graph with constructors that are generated from declarative
//! component schemas ([bindings](bindings/index.html)), the graph is serialized into an
//! [Analysis](proto/struct.Analysis.html) and handed to an external engine,
//! and the engine's [Release](proto/struct.Release.html) is parsed back into host values.
//!
//! The codecs live in [utilities::serial](utilities/serial/index.html) and
//! [utilities::privacy](utilities/privacy/index.html).

// `error_chain!` can recurse deeply
#![recursion_limit = "1024"]
#[macro_use]
extern crate error_chain;

#[doc(hidden)]
pub mod errors {
    // Create the Error, ErrorKind, ResultExt, and Result types
    error_chain! {
        foreign_links {
            Json(::serde_json::Error);
            Io(::std::io::Error);
            Decode(::prost::DecodeError);
            Encode(::prost::EncodeError);
            Shape(::ndarray::ShapeError);
        }

        errors {
            UnsupportedValue(message: String) {
                description("value cannot be represented on the wire")
                display("unsupported value: {}", message)
            }
            InvalidFormat(format: String) {
                description("invalid value format")
                display("format must be either \"array\", \"jagged\", \"indexmap\" or None, got {:?}", format)
            }
            UnknownVariant(id: String) {
                description("component id has no registered wire variant")
                display("no wire variant is registered for component {:?}", id)
            }
            UnknownEnumToken(enumeration: String, token: String) {
                description("token does not name a wire enum member")
                display("{:?} is not a member of {}", token, enumeration)
            }
            UnsupportedPrivacyVariant(variant: String) {
                description("privacy usage variant cannot be parsed")
                display("unsupported privacy variant: {}", variant)
            }
            MalformedSchema(source: String) {
                description("component schema is malformed")
                display("malformed component schema: {}", source)
            }
            InvalidCall(component: String, message: String) {
                description("component constructor was called with invalid arguments")
                display("{}(): {}", component, message)
            }
            Engine(message: String) {
                description("the engine rejected the request")
                display("engine error: {}", message)
            }
        }
    }
}

#[doc(hidden)]
pub use errors::*;

/// Wire messages exchanged with the engine, generated from `prototypes/*.proto`.
///
/// Every `oneof` is a Rust enum behind an `Option`, so no more than one variant can be populated at a time.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/smartnoise.rs"));
}
pub mod base;
pub mod utilities;
pub mod schema;
pub mod documentation;
pub mod bindings;
pub mod engine;

pub use crate::bindings::{Analysis, Bindings, Call, ComponentFactory};
pub use crate::schema::{ComponentSchema, VariantMessageMap};
pub use crate::utilities::serial::{parse_release, parse_value, serialize_analysis, serialize_component, serialize_release, serialize_value};
pub use crate::utilities::privacy::{parse_privacy_usage, serialize_privacy_usage};
