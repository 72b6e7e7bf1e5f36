use std::net::AddrParseError;

use common::ModelError;
use thiserror::Error;

/// Every variant is fatal to the decode in progress; nothing is retried
/// internally. The caller decides whether to skip, log, or abort.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed json at {path}: {message}")]
    Syntax { message: String, path: String },
    #[error("unexpected end of input at {path}")]
    Eof { path: String },
    #[error("unknown span kind {value:?} at {path}")]
    UnknownKind { value: String, path: String },
    #[error("incomplete annotation at {path}")]
    IncompleteAnnotation { path: String },
    #[error("no value at {path}")]
    MissingTagValue { path: String },
    #[error("malformed ip {literal:?} at {path}")]
    MalformedIp {
        literal: String,
        path: String,
        #[source]
        source: AddrParseError,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}
