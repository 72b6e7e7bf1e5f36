use std::collections::HashMap;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Tags = HashMap<String, String>;

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("traceId should be 1-32 lower-hex characters: {0:?}")]
    InvalidTraceId(String),
    #[error("{field} should be 1-16 lower-hex characters: {value:?}")]
    InvalidId { field: &'static str, value: String },
    #[error("traceId is required")]
    MissingTraceId,
    #[error("id is required")]
    MissingId,
    #[error("port should be between 0 and 65535: {0}")]
    InvalidPort(i64),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    Client,
    Server,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Case-sensitive match against the wire names, `None` for anything else.
    pub fn from_name(name: &str) -> Option<SpanKind> {
        match name {
            "CLIENT" => Some(SpanKind::Client),
            "SERVER" => Some(SpanKind::Server),
            "PRODUCER" => Some(SpanKind::Producer),
            "CONSUMER" => Some(SpanKind::Consumer),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpanKind::Client => "CLIENT",
            SpanKind::Server => "SERVER",
            SpanKind::Producer => "PRODUCER",
            SpanKind::Consumer => "CONSUMER",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Annotation {
    pub timestamp: u64,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub service_name: Option<String>,
    pub ip: Option<IpAddr>,
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::default()
    }
}

#[derive(Default, Debug)]
pub struct EndpointBuilder {
    service_name: Option<String>,
    ip: Option<IpAddr>,
    port: Option<u16>,
}

impl EndpointBuilder {
    /// Service names are lowercased; the empty string clears the field.
    pub fn service_name(&mut self, name: &str) -> &mut Self {
        self.service_name = if name.is_empty() {
            None
        } else {
            Some(name.to_lowercase())
        };
        self
    }

    pub fn ipv4(&mut self, literal: &str) -> Result<&mut Self, AddrParseError> {
        self.ip = Some(IpAddr::V4(literal.parse::<Ipv4Addr>()?));
        Ok(self)
    }

    pub fn ipv6(&mut self, literal: &str) -> Result<&mut Self, AddrParseError> {
        self.ip = Some(IpAddr::V6(literal.parse::<Ipv6Addr>()?));
        Ok(self)
    }

    /// Port zero clears the field, out-of-range values are rejected.
    pub fn port(&mut self, port: i64) -> Result<&mut Self, ModelError> {
        if port < 0 || port > 65535 {
            return Err(ModelError::InvalidPort(port));
        }
        self.port = if port == 0 { None } else { Some(port as u16) };
        Ok(self)
    }

    pub fn build(&self) -> Endpoint {
        Endpoint {
            service_name: self.service_name.clone(),
            ip: self.ip,
            port: self.port,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: String,
    pub parent_id: Option<String>,
    pub id: String,
    pub kind: Option<SpanKind>,
    pub name: Option<String>,
    pub timestamp: Option<u64>,
    pub duration: Option<u64>,
    pub local_endpoint: Option<Endpoint>,
    pub remote_endpoint: Option<Endpoint>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub shared: bool,
}

impl Span {
    pub fn builder() -> SpanBuilder {
        SpanBuilder::default()
    }
}

#[derive(Default, Debug)]
pub struct SpanBuilder {
    trace_id: Option<String>,
    parent_id: Option<String>,
    id: Option<String>,
    kind: Option<SpanKind>,
    name: Option<String>,
    timestamp: Option<u64>,
    duration: Option<u64>,
    local_endpoint: Option<Endpoint>,
    remote_endpoint: Option<Endpoint>,
    annotations: Vec<Annotation>,
    tags: Tags,
    debug: bool,
    shared: bool,
}

fn lower_hex(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn pad_id(value: &str, width: usize) -> String {
    let mut padded = String::with_capacity(width);
    for _ in value.len()..width {
        padded.push('0');
    }
    padded.push_str(value);
    padded
}

fn normalize_id(field: &'static str, value: &str) -> Result<String, ModelError> {
    if value.len() > 16 || !lower_hex(value) {
        return Err(ModelError::InvalidId {
            field,
            value: value.to_string(),
        });
    }
    Ok(pad_id(value, 16))
}

impl SpanBuilder {
    /// Trace ids are 1-32 lower-hex characters, zero-padded to 16 or 32.
    pub fn trace_id(&mut self, trace_id: &str) -> Result<&mut Self, ModelError> {
        if trace_id.len() > 32 || !lower_hex(trace_id) {
            return Err(ModelError::InvalidTraceId(trace_id.to_string()));
        }
        let width = if trace_id.len() > 16 { 32 } else { 16 };
        self.trace_id = Some(pad_id(trace_id, width));
        Ok(self)
    }

    pub fn id(&mut self, id: &str) -> Result<&mut Self, ModelError> {
        let id = normalize_id("id", id)?;
        if id.bytes().all(|b| b == b'0') {
            return Err(ModelError::InvalidId { field: "id", value: id });
        }
        self.id = Some(id);
        Ok(self)
    }

    /// The all-zero parent id means "root span" and normalizes to absence.
    pub fn parent_id(&mut self, parent_id: &str) -> Result<&mut Self, ModelError> {
        let parent_id = normalize_id("parentId", parent_id)?;
        self.parent_id = if parent_id.bytes().all(|b| b == b'0') {
            None
        } else {
            Some(parent_id)
        };
        Ok(self)
    }

    pub fn kind(&mut self, kind: SpanKind) -> &mut Self {
        self.kind = Some(kind);
        self
    }

    /// Span names are lowercased; the empty string clears the field.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = if name.is_empty() {
            None
        } else {
            Some(name.to_lowercase())
        };
        self
    }

    /// Non-positive timestamps clear the field.
    pub fn timestamp(&mut self, micros: i64) -> &mut Self {
        self.timestamp = if micros > 0 { Some(micros as u64) } else { None };
        self
    }

    pub fn duration(&mut self, micros: i64) -> &mut Self {
        self.duration = if micros > 0 { Some(micros as u64) } else { None };
        self
    }

    pub fn local_endpoint(&mut self, endpoint: Option<Endpoint>) -> &mut Self {
        self.local_endpoint = endpoint;
        self
    }

    pub fn remote_endpoint(&mut self, endpoint: Option<Endpoint>) -> &mut Self {
        self.remote_endpoint = endpoint;
        self
    }

    /// Annotations keep input order and duplicates.
    pub fn annotation(&mut self, timestamp: i64, value: &str) -> &mut Self {
        self.annotations.push(Annotation {
            timestamp: timestamp.max(0) as u64,
            value: value.to_string(),
        });
        self
    }

    /// Last write wins for a repeated key.
    pub fn tag(&mut self, key: &str, value: &str) -> &mut Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    pub fn shared(&mut self, shared: bool) -> &mut Self {
        self.shared = shared;
        self
    }

    /// Resets every field but keeps the annotation and tag allocations, so one
    /// builder can run through a whole stream of spans.
    pub fn clear(&mut self) {
        self.trace_id = None;
        self.parent_id = None;
        self.id = None;
        self.kind = None;
        self.name = None;
        self.timestamp = None;
        self.duration = None;
        self.local_endpoint = None;
        self.remote_endpoint = None;
        self.annotations.clear();
        self.tags.clear();
        self.debug = false;
        self.shared = false;
    }

    pub fn build(&self) -> Result<Span, ModelError> {
        let trace_id = self.trace_id.clone().ok_or(ModelError::MissingTraceId)?;
        let id = self.id.clone().ok_or(ModelError::MissingId)?;
        Ok(Span {
            trace_id,
            parent_id: self.parent_id.clone(),
            id,
            kind: self.kind,
            name: self.name.clone(),
            timestamp: self.timestamp,
            duration: self.duration,
            local_endpoint: self.local_endpoint.clone(),
            remote_endpoint: self.remote_endpoint.clone(),
            annotations: self.annotations.clone(),
            tags: self.tags.clone(),
            debug: self.debug,
            shared: self.shared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_pads_to_sixteen() {
        let mut builder = Span::builder();
        builder.trace_id("48485a3953bb6124").unwrap();
        builder.id("1").unwrap();
        let span = builder.build().unwrap();
        assert_eq!(span.trace_id, "48485a3953bb6124");
        assert_eq!(span.id, "0000000000000001");
    }

    #[test]
    fn long_trace_id_pads_to_thirty_two() {
        let mut builder = Span::builder();
        builder.trace_id("a3953bb61248485a3953bb6124").unwrap();
        builder.id("2").unwrap();
        let span = builder.build().unwrap();
        assert_eq!(span.trace_id, "000000a3953bb61248485a3953bb6124");
    }

    #[test]
    fn trace_id_rejects_upper_hex() {
        assert_eq!(
            Span::builder().trace_id("48485A3953BB6124").unwrap_err(),
            ModelError::InvalidTraceId("48485A3953BB6124".to_string())
        );
    }

    #[test]
    fn all_zero_parent_id_is_absent() {
        let mut builder = Span::builder();
        builder.trace_id("1").unwrap();
        builder.id("1").unwrap();
        builder.parent_id("0000000000000000").unwrap();
        assert_eq!(builder.build().unwrap().parent_id, None);
    }

    #[test]
    fn build_requires_trace_id_and_id() {
        assert_eq!(Span::builder().build().unwrap_err(), ModelError::MissingTraceId);
        let mut builder = Span::builder();
        builder.trace_id("1").unwrap();
        assert_eq!(builder.build().unwrap_err(), ModelError::MissingId);
    }

    #[test]
    fn name_is_lowercased_and_empty_clears() {
        let mut builder = Span::builder();
        builder.trace_id("1").unwrap();
        builder.id("1").unwrap();
        builder.name("GET /api");
        assert_eq!(builder.build().unwrap().name.as_deref(), Some("get /api"));
        builder.name("");
        assert_eq!(builder.build().unwrap().name, None);
    }

    #[test]
    fn non_positive_timestamp_clears() {
        let mut builder = Span::builder();
        builder.trace_id("1").unwrap();
        builder.id("1").unwrap();
        builder.timestamp(1472470996199000).duration(0);
        let span = builder.build().unwrap();
        assert_eq!(span.timestamp, Some(1472470996199000));
        assert_eq!(span.duration, None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut builder = Span::builder();
        builder.trace_id("1").unwrap();
        builder.id("2").unwrap();
        builder.kind(SpanKind::Client);
        builder.annotation(1, "ws").tag("http.path", "/api").debug(true);
        builder.clear();
        builder.trace_id("3").unwrap();
        builder.id("4").unwrap();
        let span = builder.build().unwrap();
        assert!(span.annotations.is_empty());
        assert!(span.tags.is_empty());
        assert_eq!(span.kind, None);
        assert!(!span.debug);
    }

    #[test]
    fn endpoint_port_zero_clears() {
        let mut builder = Endpoint::builder();
        builder.port(0).unwrap();
        assert_eq!(builder.build().port, None);
        builder.port(3306).unwrap();
        assert_eq!(builder.build().port, Some(3306));
        assert_eq!(builder.port(65536).unwrap_err(), ModelError::InvalidPort(65536));
    }

    #[test]
    fn endpoint_service_name_is_lowercased() {
        let mut builder = Endpoint::builder();
        builder.service_name("FavStar");
        assert_eq!(builder.build().service_name.as_deref(), Some("favstar"));
    }

    #[test]
    fn endpoint_later_ip_wins() {
        let mut builder = Endpoint::builder();
        builder.ipv4("43.0.192.2").unwrap();
        builder.ipv6("2001:db8::c001").unwrap();
        assert_eq!(builder.build().ip, Some("2001:db8::c001".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in &[SpanKind::Client, SpanKind::Server, SpanKind::Producer, SpanKind::Consumer] {
            assert_eq!(SpanKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(SpanKind::from_name("client"), None);
        assert_eq!(SpanKind::from_name("BOGUS"), None);
    }
}
