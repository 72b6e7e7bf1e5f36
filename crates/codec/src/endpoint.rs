use common::Endpoint;

use crate::error::DecodeError;
use crate::reader::JsonReader;

/// Reads one endpoint object. An object with no recognized non-null field
/// decodes to `None`, never to a placeholder endpoint with all defaults.
pub struct EndpointDecoder;

impl EndpointDecoder {
    pub fn decode(reader: &mut JsonReader) -> Result<Option<Endpoint>, DecodeError> {
        let mut builder = Endpoint::builder();
        let mut read_field = false;
        reader.begin_object()?;
        while reader.has_next()? {
            let name = reader.next_name()?;
            if reader.peek_null() {
                // a null member does not count as present
                reader.skip_value()?;
                continue;
            }
            match name.as_str() {
                "serviceName" => {
                    let service_name = reader.next_string()?;
                    builder.service_name(&service_name);
                    read_field = true;
                }
                "ipv4" => {
                    let literal = reader.next_string()?;
                    if let Err(source) = builder.ipv4(&literal) {
                        return Err(DecodeError::MalformedIp {
                            literal,
                            path: reader.path(),
                            source,
                        });
                    }
                    read_field = true;
                }
                "ipv6" => {
                    let literal = reader.next_string()?;
                    if let Err(source) = builder.ipv6(&literal) {
                        return Err(DecodeError::MalformedIp {
                            literal,
                            path: reader.path(),
                            source,
                        });
                    }
                    read_field = true;
                }
                "port" => {
                    let port = reader.next_int()?;
                    builder.port(i64::from(port))?;
                    read_field = true;
                }
                _ => reader.skip_value()?,
            }
        }
        reader.end_object()?;
        Ok(if read_field { Some(builder.build()) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn decode(json: &str) -> Result<Option<Endpoint>, DecodeError> {
        let mut reader = JsonReader::new(json.as_bytes());
        EndpointDecoder::decode(&mut reader)
    }

    #[test]
    fn all_null_members_decode_to_absence() {
        assert_eq!(decode(r#"{"serviceName": null, "ipv4": null}"#).unwrap(), None);
        assert_eq!(decode("{}").unwrap(), None);
    }

    #[test]
    fn port_alone_is_a_present_endpoint() {
        let endpoint = decode(r#"{"port": 80}"#).unwrap().unwrap();
        assert_eq!(endpoint.port, Some(80));
        assert_eq!(endpoint.service_name, None);
        assert_eq!(endpoint.ip, None);
    }

    #[test]
    fn later_ip_member_wins() {
        let endpoint = decode(r#"{"ipv4": "43.0.192.2", "ipv6": "2001:db8::c001"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(endpoint.ip, Some("2001:db8::c001".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn malformed_ip_is_fatal() {
        match decode(r#"{"ipv4": "not-an-ip"}"#).unwrap_err() {
            DecodeError::MalformedIp { literal, path, .. } => {
                assert_eq!(literal, "not-an-ip");
                assert_eq!(path, "$.ipv4");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unknown_members_are_skipped() {
        let endpoint = decode(r#"{"rack": "r12", "serviceName": "frontend"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(endpoint.service_name.as_deref(), Some("frontend"));
    }
}
