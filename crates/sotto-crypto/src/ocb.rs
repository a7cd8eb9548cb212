//! OCB2 block-cipher mode over AES-128.
//!
//! The offset (`delta`) walks the nonce through doublings in GF(2^128) with
//! the reduction polynomial x^128 + x^7 + x^2 + x + 1; the checksum over the
//! plaintext becomes the authentication tag. Both directions return the full
//! 16-byte tag; the datagram layer truncates it to three bytes.

use aes::cipher::{BlockDecrypt, BlockEncrypt};
use aes::{Aes128, Block};

use crate::BLOCK_SIZE;

type RawBlock = [u8; BLOCK_SIZE];

/// Double a field element (times x) in GF(2^128), big-endian bit order.
fn times2(block: &mut RawBlock) {
    let carry = block[0] >> 7;
    for i in 0..BLOCK_SIZE - 1 {
        block[i] = block[i] << 1 | block[i + 1] >> 7;
    }
    block[BLOCK_SIZE - 1] = block[BLOCK_SIZE - 1] << 1 ^ carry * 0x87;
}

/// Multiply a field element by three: x*b + b.
fn times3(block: &mut RawBlock) {
    let original = *block;
    times2(block);
    xor_into(block, &original);
}

fn xor_into(dst: &mut RawBlock, src: &RawBlock) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

fn aes_encrypt(cipher: &Aes128, block: &RawBlock) -> RawBlock {
    let mut b = Block::clone_from_slice(block);
    cipher.encrypt_block(&mut b);
    b.into()
}

fn aes_decrypt(cipher: &Aes128, block: &RawBlock) -> RawBlock {
    let mut b = Block::clone_from_slice(block);
    cipher.decrypt_block(&mut b);
    b.into()
}

/// Block holding the plaintext bit length, for the final-block pad.
fn length_block(len: usize) -> RawBlock {
    let mut block = [0u8; BLOCK_SIZE];
    block[BLOCK_SIZE - 4..].copy_from_slice(&((len * 8) as u32).to_be_bytes());
    block
}

/// Encrypt `plain` into `out` (same length) and return the tag.
pub fn ocb_encrypt(cipher: &Aes128, plain: &[u8], out: &mut [u8], nonce: &RawBlock) -> RawBlock {
    debug_assert_eq!(plain.len(), out.len());

    let mut delta = aes_encrypt(cipher, nonce);
    let mut checksum = [0u8; BLOCK_SIZE];

    let mut offset = 0;
    while plain.len() - offset > BLOCK_SIZE {
        times2(&mut delta);

        let mut tmp: RawBlock = plain[offset..offset + BLOCK_SIZE].try_into().expect("full block");
        xor_into(&mut checksum, &tmp);
        xor_into(&mut tmp, &delta);
        let mut enc = aes_encrypt(cipher, &tmp);
        xor_into(&mut enc, &delta);
        out[offset..offset + BLOCK_SIZE].copy_from_slice(&enc);

        offset += BLOCK_SIZE;
    }

    // Final (possibly partial) block.
    let remaining = plain.len() - offset;
    times2(&mut delta);

    let mut tmp = length_block(remaining);
    xor_into(&mut tmp, &delta);
    let pad = aes_encrypt(cipher, &tmp);

    let mut last = pad;
    last[..remaining].copy_from_slice(&plain[offset..]);
    xor_into(&mut checksum, &last);
    xor_into(&mut last, &pad);
    out[offset..].copy_from_slice(&last[..remaining]);

    times3(&mut delta);
    let mut tag_in = checksum;
    xor_into(&mut tag_in, &delta);
    aes_encrypt(cipher, &tag_in)
}

/// Decrypt `encrypted` into `out` (same length) and return the tag for the
/// caller to verify.
pub fn ocb_decrypt(
    cipher: &Aes128,
    encrypted: &[u8],
    out: &mut [u8],
    nonce: &RawBlock,
) -> RawBlock {
    debug_assert_eq!(encrypted.len(), out.len());

    let mut delta = aes_encrypt(cipher, nonce);
    let mut checksum = [0u8; BLOCK_SIZE];

    let mut offset = 0;
    while encrypted.len() - offset > BLOCK_SIZE {
        times2(&mut delta);

        let mut tmp: RawBlock =
            encrypted[offset..offset + BLOCK_SIZE].try_into().expect("full block");
        xor_into(&mut tmp, &delta);
        let mut dec = aes_decrypt(cipher, &tmp);
        xor_into(&mut dec, &delta);
        out[offset..offset + BLOCK_SIZE].copy_from_slice(&dec);
        xor_into(&mut checksum, &dec);

        offset += BLOCK_SIZE;
    }

    let remaining = encrypted.len() - offset;
    times2(&mut delta);

    let mut tmp = length_block(remaining);
    xor_into(&mut tmp, &delta);
    let pad = aes_encrypt(cipher, &tmp);

    let mut last = [0u8; BLOCK_SIZE];
    last[..remaining].copy_from_slice(&encrypted[offset..]);
    xor_into(&mut last, &pad);
    xor_into(&mut checksum, &last);
    out[offset..].copy_from_slice(&last[..remaining]);

    times3(&mut delta);
    let mut tag_in = checksum;
    xor_into(&mut tag_in, &delta);
    aes_encrypt(cipher, &tag_in)
}
