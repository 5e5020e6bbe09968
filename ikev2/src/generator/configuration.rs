use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::header::{ConfigurationAttributeHeader, ConfigurationHeader};
use crate::definitions::Configuration;

impl Configuration {
    /// Build the payload body (without the generic payload header)
    pub(crate) fn build_body(&self) -> Vec<u8> {
        let header = ConfigurationHeader {
            cfg_type: self.cfg_type as u8,
            reserved: [0; 3],
        };
        let mut body = Vec::with_capacity(4 + 8 * self.attributes.len());
        body.extend_from_slice(header.as_bytes());
        for attribute in &self.attributes {
            let attribute_header = ConfigurationAttributeHeader {
                attribute_type: U16::from(attribute.attribute_type as u16),
                attribute_length: U16::from(attribute.value.len() as u16),
            };
            body.extend_from_slice(attribute_header.as_bytes());
            body.extend_from_slice(&attribute.value);
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use crate::definitions::params::{ConfigurationAttributeType, ConfigurationType};
    use crate::definitions::{Configuration, ConfigurationAttribute};

    #[test]
    #[allow(clippy::unwrap_used)]
    fn address_reply() {
        let cp = Configuration {
            cfg_type: ConfigurationType::Reply,
            attributes: vec![
                ConfigurationAttribute {
                    attribute_type: ConfigurationAttributeType::InternalIp4Address,
                    value: vec![10, 0, 0, 2],
                },
                ConfigurationAttribute {
                    attribute_type: ConfigurationAttributeType::InternalIp4Netmask,
                    value: vec![255, 255, 255, 0],
                },
            ],
        };
        let body = cp.build_body();
        assert_eq!(
            body,
            vec![
                0x02, 0x00, 0x00, 0x00, // configuration header
                0x00, 0x01, 0x00, 0x04, 10, 0, 0, 2, // address attribute
                0x00, 0x02, 0x00, 0x04, 255, 255, 255, 0, // netmask attribute
            ]
        );
        let parsed = Configuration::try_parse(&body).unwrap();
        assert_eq!(cp, parsed);
    }
}
