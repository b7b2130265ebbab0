//! Identifier generation.
//!
//! Entity identifiers are 22-character base62 strings derived from a random
//! v4 UUID. In tests a sequential implementation is injected instead.

use rand::Rng;
use uuid::Uuid;

/// Length of every generated identifier.
pub const ID_LEN: usize = 22;

const BASE62: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Abstraction over identifier generation.
pub trait IdGenerator: Send + Sync {
    /// Generate a fresh, unique identifier.
    fn generate(&self) -> String;
}

/// Production generator: base62-encoded v4 UUIDs padded to [`ID_LEN`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        encode(Uuid::new_v4(), &mut rand::rng())
    }
}

/// Encodes `uuid` in base62, least significant digit first, and left-pads
/// the result with random base62 characters up to [`ID_LEN`].
fn encode(uuid: Uuid, rng: &mut impl Rng) -> String {
    let bytes = uuid.as_bytes();
    let mut value = uuid.as_u128();

    // Least significant digit first; each leading zero byte contributes a
    // trailing '0' so the encoding stays unambiguous.
    let mut digits = Vec::with_capacity(ID_LEN);
    while value > 0 {
        digits.push(BASE62[(value % 62) as usize]);
        value /= 62;
    }
    digits.extend(bytes.iter().take_while(|b| **b == 0).map(|_| b'0'));

    let mut buf = vec![0u8; ID_LEN];
    let start = ID_LEN.saturating_sub(digits.len());
    for (slot, digit) in buf[start..].iter_mut().zip(digits) {
        *slot = digit;
    }
    for slot in &mut buf[..start] {
        *slot = BASE62[rng.random_range(0..BASE62.len())];
    }

    buf.into_iter().map(char::from).collect()
}
