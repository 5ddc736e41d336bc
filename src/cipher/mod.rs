//! Block cipher primitives and modes.

pub mod aria;
pub mod cbc;

use crate::Error;

/// Common interface implemented by block ciphers in this crate.
///
/// Mirrors the `CipherAlgo` vtable used throughout CycloneCrypto, translated
/// to a trait so callers get static dispatch and an owned, typed context
/// instead of an opaque `void *`.
pub trait CipherAlgo: Sized {
    /// Human-readable algorithm name, e.g. `"ARIA"`.
    const NAME: &'static str;

    /// Block size in bytes.
    const BLOCK_SIZE: usize;

    /// Per-key expanded state (round keys, round count, ...).
    type Context;

    /// Expands `key` into a fresh context.
    fn init(key: &[u8]) -> Result<Self::Context, Error>;

    /// Encrypts exactly one `BLOCK_SIZE`-byte block.
    fn encrypt_block(ctx: &Self::Context, input: &[u8], output: &mut [u8]);

    /// Decrypts exactly one `BLOCK_SIZE`-byte block.
    fn decrypt_block(ctx: &Self::Context, input: &[u8], output: &mut [u8]);
}
