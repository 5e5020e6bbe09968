use zerocopy::FromBytes;

use crate::definitions::header::{DeleteHeader, NotifyHeader};
use crate::definitions::params::{NotifyErrorMessage, NotifyStatusMessage, SecurityProtocol};
use crate::definitions::{Delete, Notification, NotificationType};
use crate::parser::ParserError;

impl Notification {
    /// Parses a buffer into a [Notification]. The buffer must not contain
    /// the generic payload header. Fails if the buffer is empty.
    pub(crate) fn try_parse(buf: &[u8]) -> Result<Self, ParserError> {
        let notify_header =
            NotifyHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
        let spi_size = notify_header.spi_size as usize;
        if size_of::<NotifyHeader>() + spi_size > buf.len() {
            return Err(ParserError::PayloadLengthOutOfBounds);
        }
        let variant = if notify_header.is_error() {
            NotificationType::Error(NotifyErrorMessage::try_from(
                notify_header.notify_message_type.get(),
            )?)
        } else {
            NotificationType::Status(NotifyStatusMessage::try_from(
                notify_header.notify_message_type.get(),
            )?)
        };
        let protocol = SecurityProtocol::try_from(notify_header.protocol_id)?;

        let spi = if spi_size > 0 {
            Some(buf[size_of::<NotifyHeader>()..size_of::<NotifyHeader>() + spi_size].to_vec())
        } else {
            None
        };

        Ok(Self {
            variant,
            data: buf[size_of::<NotifyHeader>() + spi_size..].to_vec(),
            protocol,
            spi,
        })
    }
}

/// Parses a delete payload body (without the generic payload header).
pub(crate) fn parse_delete(buf: &[u8]) -> Result<Delete, ParserError> {
    let header = DeleteHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
    let protocol = SecurityProtocol::try_from(header.protocol_id)?;
    let num = header.num_spis.get() as usize;
    let spi_size = header.spi_size as usize;

    let spis = match (protocol, spi_size) {
        (SecurityProtocol::InternetKeyExchange, 0) => vec![],
        (
            SecurityProtocol::EncapsulatingSecurityPayload
            | SecurityProtocol::AuthenticationHeader,
            4,
        ) => {
            let body = &buf[size_of::<DeleteHeader>()..];
            if body.len() < num * 4 {
                return Err(ParserError::PayloadLengthOutOfBounds);
            }
            body.chunks_exact(4)
                .take(num)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
        _ => return Err(ParserError::ProtocolViolation),
    };

    Ok(Delete { protocol, spis })
}
