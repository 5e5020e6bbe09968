use log::warn;
use zerocopy::FromBytes;

use crate::definitions::header::{ConfigurationAttributeHeader, ConfigurationHeader};
use crate::definitions::params::{ConfigurationAttributeType, ConfigurationType};
use crate::definitions::{Configuration, ConfigurationAttribute};
use crate::parser::ParserError;

impl Configuration {
    /// Parses a buffer into a [Configuration] payload. The buffer must not
    /// contain the generic payload header.
    pub(crate) fn try_parse(buf: &[u8]) -> Result<Self, ParserError> {
        let header =
            ConfigurationHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
        let cfg_type = ConfigurationType::try_from(header.cfg_type)?;

        let mut attributes = vec![];
        let mut offset = size_of::<ConfigurationHeader>();
        while offset < buf.len() {
            let attribute_header = ConfigurationAttributeHeader::ref_from_prefix(&buf[offset..])
                .ok_or(ParserError::BufferTooSmall)?;
            let value_len = attribute_header.attribute_length.get() as usize;
            let total = size_of::<ConfigurationAttributeHeader>() + value_len;
            if offset + total > buf.len() {
                return Err(ParserError::PayloadLengthOutOfBounds);
            }

            // The top bit of the type field is reserved and stripped here
            let raw_type = attribute_header.attribute_type.get() & 0x7fff;
            match ConfigurationAttributeType::try_from(raw_type) {
                Ok(attribute_type) => attributes.push(ConfigurationAttribute {
                    attribute_type,
                    value: buf[offset + size_of::<ConfigurationAttributeHeader>()
                        ..offset + total]
                        .to_vec(),
                }),
                Err(region) => {
                    warn!("Skipping configuration attribute {raw_type} ({region:?})");
                }
            }

            offset += total;
        }

        Ok(Self {
            cfg_type,
            attributes,
        })
    }
}
