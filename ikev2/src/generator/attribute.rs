use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::header::AttributeHeader;
use crate::definitions::params::{ATTRIBUTE_TYPE_KEY_LENGTH, FLAG_ATTRIBUTE_FORMAT};

/// Build the fixed-length Key Length attribute, the only transform attribute
/// in use
pub(crate) fn build_key_length(length: u16) -> Vec<u8> {
    Vec::from(
        AttributeHeader {
            attribute_type: U16::new(ATTRIBUTE_TYPE_KEY_LENGTH | FLAG_ATTRIBUTE_FORMAT),
            attribute_value: U16::new(length),
        }
        .as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use crate::generator::attribute::build_key_length;

    #[test]
    fn test() {
        assert_eq!(build_key_length(0), vec![0x80, 0x0e, 0x00, 0x00]);
        assert_eq!(build_key_length(128), vec![0x80, 0x0e, 0x00, 0x80]);
        assert_eq!(build_key_length(255), vec![0x80, 0x0e, 0x00, 0xff]);
        assert_eq!(build_key_length(256), vec![0x80, 0x0e, 0x01, 0x00]);
        assert_eq!(build_key_length(1337), vec![0x80, 0x0e, 0x05, 0x39]);
    }
}
