//! The single source of randomness for everything the responder draws:
//! nonces, SPIs, DH private values, EAP identifiers and IVs.
//!
//! Keeping this behind one trait makes every exchange reproducible
//! bit-for-bit in tests.

use rand::rngs::OsRng;
use rand::RngCore;

/// A cryptographically secure byte source
pub trait RandomSource: Send + Sync {
    /// Fill the buffer with random bytes
    fn fill_bytes(&self, buf: &mut [u8]);

    /// Draw a single random byte
    fn next_u8(&self) -> u8 {
        let mut buf = [0u8; 1];
        self.fill_bytes(&mut buf);
        buf[0]
    }

    /// Draw a random 32-bit value
    fn next_u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_be_bytes(buf)
    }

    /// Draw a random 64-bit value
    fn next_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_be_bytes(buf)
    }
}

/// The production source, backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}
