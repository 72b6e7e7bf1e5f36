use common::{Span, SpanBuilder, SpanKind};

use crate::endpoint::EndpointDecoder;
use crate::error::DecodeError;
use crate::reader::JsonReader;

/// Closed set of recognized member names. Anything else maps to `Unknown`,
/// which is skipped at the token level (forward compatibility with newer
/// producers).
enum SpanField {
    TraceId,
    ParentId,
    Id,
    Kind,
    Name,
    Timestamp,
    Duration,
    LocalEndpoint,
    RemoteEndpoint,
    Annotations,
    Tags,
    Debug,
    Shared,
    Unknown,
}

impl SpanField {
    fn from_name(name: &str) -> SpanField {
        match name {
            "traceId" => SpanField::TraceId,
            "parentId" => SpanField::ParentId,
            "id" => SpanField::Id,
            "kind" => SpanField::Kind,
            "name" => SpanField::Name,
            "timestamp" => SpanField::Timestamp,
            "duration" => SpanField::Duration,
            "localEndpoint" => SpanField::LocalEndpoint,
            "remoteEndpoint" => SpanField::RemoteEndpoint,
            "annotations" => SpanField::Annotations,
            "tags" => SpanField::Tags,
            "debug" => SpanField::Debug,
            "shared" => SpanField::Shared,
            _ => SpanField::Unknown,
        }
    }
}

/// Decodes one span object per call. The builder is owned by the decoder and
/// cleared, not reallocated, at the top of every decode, so one instance can
/// run through a whole stream. Not safe to share across concurrent decodes:
/// use one decoder per decode in flight.
pub struct SpanDecoder {
    builder: SpanBuilder,
}

impl Default for SpanDecoder {
    fn default() -> Self {
        SpanDecoder::new()
    }
}

impl SpanDecoder {
    pub fn new() -> Self {
        SpanDecoder {
            builder: Span::builder(),
        }
    }

    pub fn decode(&mut self, reader: &mut JsonReader) -> Result<Span, DecodeError> {
        self.builder.clear();
        reader.begin_object()?;
        while reader.has_next()? {
            let name = reader.next_name()?;
            match SpanField::from_name(&name) {
                SpanField::TraceId => {
                    let value = reader.next_string()?;
                    self.builder.trace_id(&value)?;
                }
                SpanField::ParentId => {
                    let value = reader.next_string()?;
                    self.builder.parent_id(&value)?;
                }
                SpanField::Id => {
                    let value = reader.next_string()?;
                    self.builder.id(&value)?;
                }
                SpanField::Kind => {
                    let value = reader.next_string()?;
                    match SpanKind::from_name(&value) {
                        Some(kind) => {
                            self.builder.kind(kind);
                        }
                        None => {
                            return Err(DecodeError::UnknownKind {
                                value,
                                path: reader.path(),
                            })
                        }
                    }
                }
                SpanField::Name => {
                    let value = reader.next_string()?;
                    self.builder.name(&value);
                }
                SpanField::Timestamp => {
                    let value = reader.next_long()?;
                    self.builder.timestamp(value);
                }
                SpanField::Duration => {
                    let value = reader.next_long()?;
                    self.builder.duration(value);
                }
                SpanField::LocalEndpoint => {
                    let endpoint = EndpointDecoder::decode(reader)?;
                    self.builder.local_endpoint(endpoint);
                }
                SpanField::RemoteEndpoint => {
                    let endpoint = EndpointDecoder::decode(reader)?;
                    self.builder.remote_endpoint(endpoint);
                }
                SpanField::Annotations => self.decode_annotations(reader)?,
                SpanField::Tags => self.decode_tags(reader)?,
                SpanField::Debug => {
                    // only an explicit true is recorded
                    if reader.next_boolean()? {
                        self.builder.debug(true);
                    }
                }
                SpanField::Shared => {
                    if reader.next_boolean()? {
                        self.builder.shared(true);
                    }
                }
                SpanField::Unknown => reader.skip_value()?,
            }
        }
        reader.end_object()?;
        let span = self.builder.build()?;
        Ok(span)
    }

    fn decode_annotations(&mut self, reader: &mut JsonReader) -> Result<(), DecodeError> {
        reader.begin_array()?;
        while reader.has_next()? {
            self.decode_annotation(reader)?;
        }
        reader.end_array()?;
        Ok(())
    }

    /// An annotation is atomic: both members must be present or the whole
    /// decode fails, it is never silently dropped.
    fn decode_annotation(&mut self, reader: &mut JsonReader) -> Result<(), DecodeError> {
        reader.begin_object()?;
        let mut timestamp = None;
        let mut value = None;
        while reader.has_next()? {
            match reader.next_name()?.as_str() {
                "timestamp" => timestamp = Some(reader.next_long()?),
                "value" => value = Some(reader.next_string()?),
                _ => reader.skip_value()?,
            }
        }
        match (timestamp, value) {
            (Some(timestamp), Some(value)) => {
                reader.end_object()?;
                self.builder.annotation(timestamp, &value);
                Ok(())
            }
            _ => Err(DecodeError::IncompleteAnnotation {
                path: reader.path(),
            }),
        }
    }

    fn decode_tags(&mut self, reader: &mut JsonReader) -> Result<(), DecodeError> {
        reader.begin_object()?;
        while reader.has_next()? {
            let key = reader.next_name()?;
            if reader.peek_null() {
                return Err(DecodeError::MissingTagValue {
                    path: reader.path(),
                });
            }
            let value = reader.next_string()?;
            self.builder.tag(&key, &value);
        }
        reader.end_object()?;
        Ok(())
    }
}
