//! Streaming decoder for Zipkin v2 span JSON: one forward pass over a token
//! reader, no intermediate value tree.

pub mod endpoint;
pub mod error;
pub mod reader;
pub mod span;

pub use crate::endpoint::EndpointDecoder;
pub use crate::error::DecodeError;
pub use crate::reader::JsonReader;
pub use crate::span::SpanDecoder;
