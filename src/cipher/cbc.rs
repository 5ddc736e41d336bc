//! Cipher Block Chaining mode, generic over any [`CipherAlgo`].
//!
//! Grounded on `cyclone_crypto/cipher_mode_cbc.h`'s `cbcEncrypt`/`cbcDecrypt`
//! signatures: caller-managed IV, in-place chaining, block-multiple length
//! enforced up front.

use crate::Error;

use super::CipherAlgo;

/// Encrypts `data` in place using CBC chaining, starting from `iv`.
///
/// `data.len()` must be a non-zero multiple of `C::BLOCK_SIZE`; `iv.len()`
/// must equal `C::BLOCK_SIZE`. On return, `iv` holds the last ciphertext
/// block, ready to chain into a subsequent call.
pub fn cbc_encrypt<C: CipherAlgo>(
    ctx: &C::Context,
    iv: &mut [u8],
    data: &mut [u8],
) -> Result<(), Error> {
    check_alignment::<C>(iv, data)?;

    let mut prev = vec![0u8; C::BLOCK_SIZE];
    prev.copy_from_slice(iv);

    for block in data.chunks_mut(C::BLOCK_SIZE) {
        for i in 0..C::BLOCK_SIZE {
            block[i] ^= prev[i];
        }

        let input = block.to_vec();
        C::encrypt_block(ctx, &input, block);

        prev.copy_from_slice(block);
    }

    iv.copy_from_slice(&prev);
    Ok(())
}

/// Decrypts `data` in place using CBC chaining, starting from `iv`.
pub fn cbc_decrypt<C: CipherAlgo>(
    ctx: &C::Context,
    iv: &mut [u8],
    data: &mut [u8],
) -> Result<(), Error> {
    check_alignment::<C>(iv, data)?;

    let mut prev = vec![0u8; C::BLOCK_SIZE];
    prev.copy_from_slice(iv);

    for block in data.chunks_mut(C::BLOCK_SIZE) {
        let ciphertext = block.to_vec();

        C::decrypt_block(ctx, &ciphertext, block);
        for i in 0..C::BLOCK_SIZE {
            block[i] ^= prev[i];
        }

        prev.copy_from_slice(&ciphertext);
    }

    iv.copy_from_slice(&prev);
    Ok(())
}

fn check_alignment<C: CipherAlgo>(iv: &[u8], data: &[u8]) -> Result<(), Error> {
    if iv.len() != C::BLOCK_SIZE {
        return Err(Error::InvalidParameter);
    }
    if data.is_empty() || data.len() % C::BLOCK_SIZE != 0 {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::aria::Aria;

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let key = [0x2Bu8; 16];
        let ctx = Aria::init(&key).unwrap();

        let plaintext = b"the quick brown fox jumps over ".to_vec();
        assert_eq!(plaintext.len() % 16, 0);

        let iv = [0x00u8; 16];

        let mut ct = plaintext.clone();
        let mut iv_enc = iv;
        cbc_encrypt::<Aria>(&ctx, &mut iv_enc, &mut ct).unwrap();
        assert_ne!(ct, plaintext);

        let mut pt = ct.clone();
        let mut iv_dec = iv;
        cbc_decrypt::<Aria>(&ctx, &mut iv_dec, &mut pt).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn identical_blocks_chain_to_different_ciphertext() {
        let key = [0x11u8; 16];
        let ctx = Aria::init(&key).unwrap();

        let plaintext = [0x42u8; 32];
        let mut ct = plaintext.to_vec();
        let mut iv = [0x01u8; 16];
        cbc_encrypt::<Aria>(&ctx, &mut iv, &mut ct).unwrap();

        assert_ne!(ct[0..16], ct[16..32]);
    }

    #[test]
    fn rejects_length_not_a_multiple_of_block_size() {
        let key = [0x01u8; 16];
        let ctx = Aria::init(&key).unwrap();

        let mut iv = [0u8; 16];
        let mut data = vec![0u8; 20];
        assert!(matches!(
            cbc_encrypt::<Aria>(&ctx, &mut iv, &mut data),
            Err(Error::InvalidParameter)
        ));
    }

    #[test]
    fn rejects_wrong_sized_iv() {
        let key = [0x01u8; 16];
        let ctx = Aria::init(&key).unwrap();

        let mut iv = vec![0u8; 8];
        let mut data = vec![0u8; 16];
        assert!(matches!(
            cbc_encrypt::<Aria>(&ctx, &mut iv, &mut data),
            Err(Error::InvalidParameter)
        ));
    }
}
