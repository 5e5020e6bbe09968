use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::header::{DeleteHeader, GenericPayloadHeader, NotifyHeader};
use crate::definitions::params::{
    NotifyErrorMessage, NotifyStatusMessage, PayloadType, SecurityProtocol,
};
use crate::definitions::{Delete, Notification, NotificationType};
use crate::generator::GeneratorError;

impl Notification {
    /// Shorthand for an error notification without SPI
    pub fn error(message: NotifyErrorMessage, data: Vec<u8>) -> Self {
        Self {
            variant: NotificationType::Error(message),
            data,
            protocol: SecurityProtocol::Reserved,
            spi: None,
        }
    }

    /// Shorthand for a status notification without SPI
    pub fn status(message: NotifyStatusMessage, data: Vec<u8>) -> Self {
        Self {
            variant: NotificationType::Status(message),
            data,
            protocol: SecurityProtocol::Reserved,
            spi: None,
        }
    }

    pub(crate) fn try_build(&self, next_payload: PayloadType) -> Result<Vec<u8>, GeneratorError> {
        let notification_type = match &self.variant {
            NotificationType::Error(e) => *e as u16,
            NotificationType::Status(s) => *s as u16,
        };

        let spi_len = match &self.spi {
            Some(spi_data) => {
                if spi_data.len() > 255 {
                    return Err(GeneratorError::PayloadTooLarge);
                }
                spi_data.len() as u8
            }
            None => 0,
        };
        let generic_header = GenericPayloadHeader {
            next_payload: next_payload as u8,
            critical: 0,
            payload_length: U16::from(8 + spi_len as u16 + self.data.len() as u16),
        };
        let notify_header = NotifyHeader {
            protocol_id: if self.spi.is_none() {
                0
            } else {
                self.protocol as u8
            },
            spi_size: spi_len,
            notify_message_type: U16::from(notification_type),
        };

        let mut packet = Vec::with_capacity(self.data.len() + 8);
        packet.extend_from_slice(generic_header.as_bytes());
        packet.extend_from_slice(notify_header.as_bytes());
        if let Some(data) = &self.spi {
            packet.extend_from_slice(data);
        }
        packet.extend_from_slice(&self.data);
        Ok(packet)
    }
}

impl Delete {
    pub(crate) fn build(&self, next_payload: PayloadType) -> Vec<u8> {
        let spi_size: u8 = match self.protocol {
            SecurityProtocol::InternetKeyExchange => 0,
            _ => 4,
        };
        let generic_header = GenericPayloadHeader {
            next_payload: next_payload as u8,
            critical: 0,
            payload_length: U16::from(
                (size_of::<GenericPayloadHeader>()
                    + size_of::<DeleteHeader>()
                    + self.spis.len() * spi_size as usize) as u16,
            ),
        };
        let delete_header = DeleteHeader {
            protocol_id: self.protocol as u8,
            spi_size,
            num_spis: U16::from(self.spis.len() as u16),
        };

        let mut packet = Vec::with_capacity(8 + self.spis.len() * 4);
        packet.extend_from_slice(generic_header.as_bytes());
        packet.extend_from_slice(delete_header.as_bytes());
        if spi_size == 4 {
            for spi in &self.spis {
                packet.extend_from_slice(&spi.to_be_bytes());
            }
        }
        packet
    }
}

#[cfg(test)]
mod tests {
    use crate::definitions::params::{
        NotifyErrorMessage, NotifyStatusMessage, PayloadType, SecurityProtocol,
    };
    use crate::definitions::{Delete, Notification, NotificationType};

    #[test]
    #[allow(clippy::unwrap_used)]
    fn generate_and_parse_notify() {
        let spi = [0x00, 0x01, 0x02, 0x03];
        let notify = Notification {
            variant: NotificationType::Error(NotifyErrorMessage::InvalidSpi),
            data: vec![0x13, 0x37],
            protocol: SecurityProtocol::EncapsulatingSecurityPayload,
            spi: Some(spi.to_vec()),
        };
        let generated_notify = notify.try_build(PayloadType::NoNextPayload).unwrap();
        let expected_result = vec![
            0x00, 0x00, 0x00, 0x0e, // Generic Payload Header
            0x03, 0x04, 0x00, 0x0b, // Notification header
            0x00, 0x01, 0x02, 0x03, // SPI
            0x13, 0x37, // Data
        ];
        assert_eq!(generated_notify, expected_result);
        let parsed_notify = Notification::try_parse(&expected_result[4..]).unwrap();
        assert_eq!(notify, parsed_notify);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn generate_and_parse_nat_detection() {
        let notification = Notification::status(
            NotifyStatusMessage::NatDetectionSourceIp,
            vec![0xaa; 20],
        );
        let generated = notification.try_build(PayloadType::Notify).unwrap();
        assert_eq!(generated[0], 0x29);
        assert_eq!(generated[3], 8 + 20);
        assert_eq!(&generated[6..8], &[0x40, 0x04]);
        let parsed = Notification::try_parse(&generated[4..]).unwrap();
        assert_eq!(notification, parsed);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn generate_and_parse_delete() {
        let delete = Delete {
            protocol: SecurityProtocol::EncapsulatingSecurityPayload,
            spis: vec![0x01020304, 0xfffefdfc],
        };
        let built = delete.build(PayloadType::NoNextPayload);
        assert_eq!(
            built,
            vec![
                0x00, 0x00, 0x00, 0x10, // Generic Payload Header
                0x03, 0x04, 0x00, 0x02, // Delete header
                0x01, 0x02, 0x03, 0x04, // SPI 1
                0xff, 0xfe, 0xfd, 0xfc, // SPI 2
            ]
        );
        let parsed = crate::parser::parse_delete(&built[4..]).unwrap();
        assert_eq!(delete, parsed);
    }

    #[test]
    fn ike_delete_has_no_spis() {
        let delete = Delete {
            protocol: SecurityProtocol::InternetKeyExchange,
            spis: vec![],
        };
        assert_eq!(
            delete.build(PayloadType::NoNextPayload),
            vec![0x00, 0x00, 0x00, 0x08, 0x01, 0x00, 0x00, 0x00]
        );
    }
}
