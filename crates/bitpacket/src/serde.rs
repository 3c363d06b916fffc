//! JSON-deserializable protocol descriptions.
//!
//! These types describe the *shape* of a packet: an ordered field list plus
//! the protocol endianness. They are intended to be loaded from JSON (for
//! example a protocol file shipped with your application) and then converted
//! into a [Protocol]. The conversion applies the same validation as
//! [Protocol::append_field].

use serde::{Deserialize, Serialize};

use crate::{
    buffer::BufferSource,
    errors::Error,
    field::{FieldInit, VisType},
    protocol::Protocol,
};

/// Top-level protocol definition.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolDef {
    /// Fields in packing order.
    pub fields: Vec<FieldDef>,
    /// Byte order for multi-byte values; defaults to big-endian.
    #[serde(default)]
    pub little_endian: bool,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    pub bit_count: usize,
    #[serde(default)]
    pub vis_type: VisTypeDef,
}

/// Display classification of a field's value.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub enum VisTypeDef {
    SignedInteger,
    #[default]
    UnsignedInteger,
    FloatingPoint,
}

impl From<VisTypeDef> for VisType {
    fn from(value: VisTypeDef) -> Self {
        match value {
            VisTypeDef::SignedInteger => VisType::SignedInteger,
            VisTypeDef::UnsignedInteger => VisType::UnsignedInteger,
            VisTypeDef::FloatingPoint => VisType::FloatingPoint,
        }
    }
}

impl From<VisType> for VisTypeDef {
    fn from(value: VisType) -> Self {
        match value {
            VisType::SignedInteger => VisTypeDef::SignedInteger,
            VisType::UnsignedInteger => VisTypeDef::UnsignedInteger,
            VisType::FloatingPoint => VisTypeDef::FloatingPoint,
        }
    }
}

impl TryFrom<ProtocolDef> for Protocol {
    type Error = Error;

    fn try_from(def: ProtocolDef) -> Result<Self, Self::Error> {
        let mut protocol = Protocol::new(def.little_endian, BufferSource::Internal, None);
        for field in def.fields {
            protocol.append_field(
                FieldInit {
                    name: field.name,
                    bit_count: field.bit_count,
                    vis_type: field.vis_type.into(),
                },
                false,
            )?;
        }
        Ok(protocol)
    }
}

impl From<&Protocol> for ProtocolDef {
    fn from(protocol: &Protocol) -> Self {
        let fields = protocol
            .field_names()
            .iter()
            .filter_map(|name| {
                protocol.field_metadata(name).map(|metadata| FieldDef {
                    name: name.clone(),
                    bit_count: metadata.bit_count,
                    vis_type: metadata.vis_type.into(),
                })
            })
            .collect();

        ProtocolDef {
            fields,
            little_endian: protocol.is_little_endian(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_json() {
        let def: ProtocolDef = serde_json::from_str(
            r#"{
                "fields": [
                    {"name": "id", "bit_count": 8},
                    {"name": "value", "bit_count": 13, "vis_type": "SignedInteger"}
                ]
            }"#,
        )
        .unwrap();

        let protocol = Protocol::try_from(def).unwrap();
        assert!(!protocol.is_little_endian());
        assert_eq!(protocol.bit_len(), 21);
        assert_eq!(protocol.internal_buffer_len(), 3);
        assert_eq!(
            protocol.field_metadata("value").unwrap().vis_type,
            VisType::SignedInteger
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let def: ProtocolDef = serde_json::from_str(
            r#"{"fields": [
                {"name": "id", "bit_count": 8},
                {"name": "id", "bit_count": 4}
            ]}"#,
        )
        .unwrap();
        assert_eq!(Protocol::try_from(def).unwrap_err(), Error::BadInput);
    }

    #[test]
    fn test_definition_round_trip() {
        let mut protocol = Protocol::new(true, BufferSource::Internal, None);
        protocol.append_field(FieldInit::new("id", 8), false).unwrap();
        protocol
            .append_field(
                FieldInit::new_with_vis_type("f", 32, VisType::FloatingPoint),
                false,
            )
            .unwrap();

        let def = ProtocolDef::from(&protocol);
        let json = serde_json::to_string(&def).unwrap();
        let reparsed: ProtocolDef = serde_json::from_str(&json).unwrap();
        let rebuilt = Protocol::try_from(reparsed).unwrap();

        assert_eq!(rebuilt.field_names(), protocol.field_names());
        assert_eq!(rebuilt.bit_len(), protocol.bit_len());
        assert!(rebuilt.is_little_endian());
    }
}
