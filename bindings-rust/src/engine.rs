//! The boundary to the external engine that evaluates analyses.
//!
//! Requests and responses cross the boundary as serialized protobuf,
//! so the engine may live behind FFI, a socket, or in-process.

use crate::errors::*;

use crate::base::Release;
use crate::bindings::Analysis;
use crate::proto;
use crate::utilities::serial::{parse_release, serialize_analysis, serialize_filter_level, serialize_release};

use error_chain::ChainedError;
use prost::Message;
use tracing::debug;

/// A synchronous engine call. Takes a serialized request and returns the serialized response.
pub trait Engine {
    fn submit(&self, request: &[u8]) -> Result<Vec<u8>>;
}

impl<F> Engine for F where F: Fn(&[u8]) -> Result<Vec<u8>> {
    fn submit(&self, request: &[u8]) -> Result<Vec<u8>> {
        self(request)
    }
}

pub fn encode<T: Message>(message: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buffer)?;
    Ok(buffer)
}

/// Error message to send back across the boundary, with its full chain of causes.
pub fn serialize_error(err: Error) -> proto::Error {
    proto::Error { message: err.display_chain().to_string() }
}

/// Build the release request for the current state of an analysis.
pub fn request_release(analysis: &Analysis) -> Result<proto::RequestRelease> {
    Ok(proto::RequestRelease {
        analysis: Some(serialize_analysis(analysis)?),
        release: Some(serialize_release(&analysis.release)?),
        stack_trace: analysis.config.stack_trace,
        filter_level: serialize_filter_level(&analysis.config.filter_level)? as i32,
    })
}

/// Submit an analysis to the engine and parse the release it returns.
pub fn execute_release(engine: &dyn Engine, analysis: &Analysis) -> Result<Release> {
    let request = encode(&request_release(analysis)?)?;
    debug!(bytes = request.len(), submission = analysis.submission_count, "submitting release request");

    let response = proto::ResponseRelease::decode(&engine.submit(&request)?[..])?;

    match response.value.ok_or("engine response must contain a value")? {
        proto::response_release::Value::Data(release) => {
            debug!(nodes = release.values.len(), "received release");
            parse_release(release)
        }
        proto::response_release::Value::Error(error) =>
            Err(ErrorKind::Engine(error.message).into())
    }
}
