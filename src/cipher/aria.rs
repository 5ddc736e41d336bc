//! ARIA block cipher (RFC 5794).
//!
//! 128-bit block, 128/192/256-bit keys, 12/14/16 rounds respectively.

use crate::Error;

use super::CipherAlgo;

const BLOCK_SIZE: usize = 16;

#[rustfmt::skip]
const SB1: [u8; 256] = [
    0x63, 0x7C, 0x77, 0x7B, 0xF2, 0x6B, 0x6F, 0xC5, 0x30, 0x01, 0x67, 0x2B, 0xFE, 0xD7, 0xAB, 0x76,
    0xCA, 0x82, 0xC9, 0x7D, 0xFA, 0x59, 0x47, 0xF0, 0xAD, 0xD4, 0xA2, 0xAF, 0x9C, 0xA4, 0x72, 0xC0,
    0xB7, 0xFD, 0x93, 0x26, 0x36, 0x3F, 0xF7, 0xCC, 0x34, 0xA5, 0xE5, 0xF1, 0x71, 0xD8, 0x31, 0x15,
    0x04, 0xC7, 0x23, 0xC3, 0x18, 0x96, 0x05, 0x9A, 0x07, 0x12, 0x80, 0xE2, 0xEB, 0x27, 0xB2, 0x75,
    0x09, 0x83, 0x2C, 0x1A, 0x1B, 0x6E, 0x5A, 0xA0, 0x52, 0x3B, 0xD6, 0xB3, 0x29, 0xE3, 0x2F, 0x84,
    0x53, 0xD1, 0x00, 0xED, 0x20, 0xFC, 0xB1, 0x5B, 0x6A, 0xCB, 0xBE, 0x39, 0x4A, 0x4C, 0x58, 0xCF,
    0xD0, 0xEF, 0xAA, 0xFB, 0x43, 0x4D, 0x33, 0x85, 0x45, 0xF9, 0x02, 0x7F, 0x50, 0x3C, 0x9F, 0xA8,
    0x51, 0xA3, 0x40, 0x8F, 0x92, 0x9D, 0x38, 0xF5, 0xBC, 0xB6, 0xDA, 0x21, 0x10, 0xFF, 0xF3, 0xD2,
    0xCD, 0x0C, 0x13, 0xEC, 0x5F, 0x97, 0x44, 0x17, 0xC4, 0xA7, 0x7E, 0x3D, 0x64, 0x5D, 0x19, 0x73,
    0x60, 0x81, 0x4F, 0xDC, 0x22, 0x2A, 0x90, 0x88, 0x46, 0xEE, 0xB8, 0x14, 0xDE, 0x5E, 0x0B, 0xDB,
    0xE0, 0x32, 0x3A, 0x0A, 0x49, 0x06, 0x24, 0x5C, 0xC2, 0xD3, 0xAC, 0x62, 0x91, 0x95, 0xE4, 0x79,
    0xE7, 0xC8, 0x37, 0x6D, 0x8D, 0xD5, 0x4E, 0xA9, 0x6C, 0x56, 0xF4, 0xEA, 0x65, 0x7A, 0xAE, 0x08,
    0xBA, 0x78, 0x25, 0x2E, 0x1C, 0xA6, 0xB4, 0xC6, 0xE8, 0xDD, 0x74, 0x1F, 0x4B, 0xBD, 0x8B, 0x8A,
    0x70, 0x3E, 0xB5, 0x66, 0x48, 0x03, 0xF6, 0x0E, 0x61, 0x35, 0x57, 0xB9, 0x86, 0xC1, 0x1D, 0x9E,
    0xE1, 0xF8, 0x98, 0x11, 0x69, 0xD9, 0x8E, 0x94, 0x9B, 0x1E, 0x87, 0xE9, 0xCE, 0x55, 0x28, 0xDF,
    0x8C, 0xA1, 0x89, 0x0D, 0xBF, 0xE6, 0x42, 0x68, 0x41, 0x99, 0x2D, 0x0F, 0xB0, 0x54, 0xBB, 0x16,
];

#[rustfmt::skip]
const SB2: [u8; 256] = [
    0xE2, 0x4E, 0x54, 0xFC, 0x94, 0xC2, 0x4A, 0xCC, 0x62, 0x0D, 0x6A, 0x46, 0x3C, 0x4D, 0x8B, 0xD1,
    0x5E, 0xFA, 0x64, 0xCB, 0xB4, 0x97, 0xBE, 0x2B, 0xBC, 0x77, 0x2E, 0x03, 0xD3, 0x19, 0x59, 0xC1,
    0x1D, 0x06, 0x41, 0x6B, 0x55, 0xF0, 0x99, 0x69, 0xEA, 0x9C, 0x18, 0xAE, 0x63, 0xDF, 0xE7, 0xBB,
    0x00, 0x73, 0x66, 0xFB, 0x96, 0x4C, 0x85, 0xE4, 0x3A, 0x09, 0x45, 0xAA, 0x0F, 0xEE, 0x10, 0xEB,
    0x2D, 0x7F, 0xF4, 0x29, 0xAC, 0xCF, 0xAD, 0x91, 0x8D, 0x78, 0xC8, 0x95, 0xF9, 0x2F, 0xCE, 0xCD,
    0x08, 0x7A, 0x88, 0x38, 0x5C, 0x83, 0x2A, 0x28, 0x47, 0xDB, 0xB8, 0xC7, 0x93, 0xA4, 0x12, 0x53,
    0xFF, 0x87, 0x0E, 0x31, 0x36, 0x21, 0x58, 0x48, 0x01, 0x8E, 0x37, 0x74, 0x32, 0xCA, 0xE9, 0xB1,
    0xB7, 0xAB, 0x0C, 0xD7, 0xC4, 0x56, 0x42, 0x26, 0x07, 0x98, 0x60, 0xD9, 0xB6, 0xB9, 0x11, 0x40,
    0xEC, 0x20, 0x8C, 0xBD, 0xA0, 0xC9, 0x84, 0x04, 0x49, 0x23, 0xF1, 0x4F, 0x50, 0x1F, 0x13, 0xDC,
    0xD8, 0xC0, 0x9E, 0x57, 0xE3, 0xC3, 0x7B, 0x65, 0x3B, 0x02, 0x8F, 0x3E, 0xE8, 0x25, 0x92, 0xE5,
    0x15, 0xDD, 0xFD, 0x17, 0xA9, 0xBF, 0xD4, 0x9A, 0x7E, 0xC5, 0x39, 0x67, 0xFE, 0x76, 0x9D, 0x43,
    0xA7, 0xE1, 0xD0, 0xF5, 0x68, 0xF2, 0x1B, 0x34, 0x70, 0x05, 0xA3, 0x8A, 0xD5, 0x79, 0x86, 0xA8,
    0x30, 0xC6, 0x51, 0x4B, 0x1E, 0xA6, 0x27, 0xF6, 0x35, 0xD2, 0x6E, 0x24, 0x16, 0x82, 0x5F, 0xDA,
    0xE6, 0x75, 0xA2, 0xEF, 0x2C, 0xB2, 0x1C, 0x9F, 0x5D, 0x6F, 0x80, 0x0A, 0x72, 0x44, 0x9B, 0x6C,
    0x90, 0x0B, 0x5B, 0x33, 0x7D, 0x5A, 0x52, 0xF3, 0x61, 0xA1, 0xF7, 0xB0, 0xD6, 0x3F, 0x7C, 0x6D,
    0xED, 0x14, 0xE0, 0xA5, 0x3D, 0x22, 0xB3, 0xF8, 0x89, 0xDE, 0x71, 0x1A, 0xAF, 0xBA, 0xB5, 0x81,
];

#[rustfmt::skip]
const SB3: [u8; 256] = [
    0x52, 0x09, 0x6A, 0xD5, 0x30, 0x36, 0xA5, 0x38, 0xBF, 0x40, 0xA3, 0x9E, 0x81, 0xF3, 0xD7, 0xFB,
    0x7C, 0xE3, 0x39, 0x82, 0x9B, 0x2F, 0xFF, 0x87, 0x34, 0x8E, 0x43, 0x44, 0xC4, 0xDE, 0xE9, 0xCB,
    0x54, 0x7B, 0x94, 0x32, 0xA6, 0xC2, 0x23, 0x3D, 0xEE, 0x4C, 0x95, 0x0B, 0x42, 0xFA, 0xC3, 0x4E,
    0x08, 0x2E, 0xA1, 0x66, 0x28, 0xD9, 0x24, 0xB2, 0x76, 0x5B, 0xA2, 0x49, 0x6D, 0x8B, 0xD1, 0x25,
    0x72, 0xF8, 0xF6, 0x64, 0x86, 0x68, 0x98, 0x16, 0xD4, 0xA4, 0x5C, 0xCC, 0x5D, 0x65, 0xB6, 0x92,
    0x6C, 0x70, 0x48, 0x50, 0xFD, 0xED, 0xB9, 0xDA, 0x5E, 0x15, 0x46, 0x57, 0xA7, 0x8D, 0x9D, 0x84,
    0x90, 0xD8, 0xAB, 0x00, 0x8C, 0xBC, 0xD3, 0x0A, 0xF7, 0xE4, 0x58, 0x05, 0xB8, 0xB3, 0x45, 0x06,
    0xD0, 0x2C, 0x1E, 0x8F, 0xCA, 0x3F, 0x0F, 0x02, 0xC1, 0xAF, 0xBD, 0x03, 0x01, 0x13, 0x8A, 0x6B,
    0x3A, 0x91, 0x11, 0x41, 0x4F, 0x67, 0xDC, 0xEA, 0x97, 0xF2, 0xCF, 0xCE, 0xF0, 0xB4, 0xE6, 0x73,
    0x96, 0xAC, 0x74, 0x22, 0xE7, 0xAD, 0x35, 0x85, 0xE2, 0xF9, 0x37, 0xE8, 0x1C, 0x75, 0xDF, 0x6E,
    0x47, 0xF1, 0x1A, 0x71, 0x1D, 0x29, 0xC5, 0x89, 0x6F, 0xB7, 0x62, 0x0E, 0xAA, 0x18, 0xBE, 0x1B,
    0xFC, 0x56, 0x3E, 0x4B, 0xC6, 0xD2, 0x79, 0x20, 0x9A, 0xDB, 0xC0, 0xFE, 0x78, 0xCD, 0x5A, 0xF4,
    0x1F, 0xDD, 0xA8, 0x33, 0x88, 0x07, 0xC7, 0x31, 0xB1, 0x12, 0x10, 0x59, 0x27, 0x80, 0xEC, 0x5F,
    0x60, 0x51, 0x7F, 0xA9, 0x19, 0xB5, 0x4A, 0x0D, 0x2D, 0xE5, 0x7A, 0x9F, 0x93, 0xC9, 0x9C, 0xEF,
    0xA0, 0xE0, 0x3B, 0x4D, 0xAE, 0x2A, 0xF5, 0xB0, 0xC8, 0xEB, 0xBB, 0x3C, 0x83, 0x53, 0x99, 0x61,
    0x17, 0x2B, 0x04, 0x7E, 0xBA, 0x77, 0xD6, 0x26, 0xE1, 0x69, 0x14, 0x63, 0x55, 0x21, 0x0C, 0x7D,
];

#[rustfmt::skip]
const SB4: [u8; 256] = [
    0x30, 0x68, 0x99, 0x1B, 0x87, 0xB9, 0x21, 0x78, 0x50, 0x39, 0xDB, 0xE1, 0x72, 0x09, 0x62, 0x3C,
    0x3E, 0x7E, 0x5E, 0x8E, 0xF1, 0xA0, 0xCC, 0xA3, 0x2A, 0x1D, 0xFB, 0xB6, 0xD6, 0x20, 0xC4, 0x8D,
    0x81, 0x65, 0xF5, 0x89, 0xCB, 0x9D, 0x77, 0xC6, 0x57, 0x43, 0x56, 0x17, 0xD4, 0x40, 0x1A, 0x4D,
    0xC0, 0x63, 0x6C, 0xE3, 0xB7, 0xC8, 0x64, 0x6A, 0x53, 0xAA, 0x38, 0x98, 0x0C, 0xF4, 0x9B, 0xED,
    0x7F, 0x22, 0x76, 0xAF, 0xDD, 0x3A, 0x0B, 0x58, 0x67, 0x88, 0x06, 0xC3, 0x35, 0x0D, 0x01, 0x8B,
    0x8C, 0xC2, 0xE6, 0x5F, 0x02, 0x24, 0x75, 0x93, 0x66, 0x1E, 0xE5, 0xE2, 0x54, 0xD8, 0x10, 0xCE,
    0x7A, 0xE8, 0x08, 0x2C, 0x12, 0x97, 0x32, 0xAB, 0xB4, 0x27, 0x0A, 0x23, 0xDF, 0xEF, 0xCA, 0xD9,
    0xB8, 0xFA, 0xDC, 0x31, 0x6B, 0xD1, 0xAD, 0x19, 0x49, 0xBD, 0x51, 0x96, 0xEE, 0xE4, 0xA8, 0x41,
    0xDA, 0xFF, 0xCD, 0x55, 0x86, 0x36, 0xBE, 0x61, 0x52, 0xF8, 0xBB, 0x0E, 0x82, 0x48, 0x69, 0x9A,
    0xE0, 0x47, 0x9E, 0x5C, 0x04, 0x4B, 0x34, 0x15, 0x79, 0x26, 0xA7, 0xDE, 0x29, 0xAE, 0x92, 0xD7,
    0x84, 0xE9, 0xD2, 0xBA, 0x5D, 0xF3, 0xC5, 0xB0, 0xBF, 0xA4, 0x3B, 0x71, 0x44, 0x46, 0x2B, 0xFC,
    0xEB, 0x6F, 0xD5, 0xF6, 0x14, 0xFE, 0x7C, 0x70, 0x5A, 0x7D, 0xFD, 0x2F, 0x18, 0x83, 0x16, 0xA5,
    0x91, 0x1F, 0x05, 0x95, 0x74, 0xA9, 0xC1, 0x5B, 0x4A, 0x85, 0x6D, 0x13, 0x07, 0x4F, 0x4E, 0x45,
    0xB2, 0x0F, 0xC9, 0x1C, 0xA6, 0xBC, 0xEC, 0x73, 0x90, 0x7B, 0xCF, 0x59, 0x8F, 0xA1, 0xF9, 0x2D,
    0xF2, 0xB1, 0x00, 0x94, 0x37, 0x9F, 0xD0, 0x2E, 0x9C, 0x6E, 0x28, 0x3F, 0x80, 0xF0, 0x3D, 0xD3,
    0x25, 0x8A, 0xB5, 0xE7, 0x42, 0xB3, 0xC7, 0xEA, 0xF7, 0x4C, 0x11, 0x33, 0x03, 0xA2, 0xAC, 0x60,
];

// The three 128-bit key-schedule constants, split from RFC 5794's `c[12]`
// array of 32-bit words into big-endian byte form.
const CK1: [u8; 16] = [
    0x51, 0x7C, 0xC1, 0xB7, 0x27, 0x22, 0x0A, 0x94, 0xFE, 0x13, 0xAB, 0xE8, 0xFA, 0x9A, 0x6E, 0xE0,
];
const CK2: [u8; 16] = [
    0x6D, 0xB1, 0x4A, 0xCC, 0x9E, 0x21, 0xC8, 0x20, 0xFF, 0x28, 0xB1, 0xD5, 0xEF, 0x5D, 0xE2, 0xB0,
];
const CK3: [u8; 16] = [
    0xDB, 0x92, 0x37, 0x1D, 0x21, 0x26, 0xE9, 0x70, 0x03, 0x24, 0x97, 0x75, 0x04, 0xE8, 0xC9, 0x0E,
];

fn xor128(a: &[u8; 16], b: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn rol128(a: &[u8; 16], n: u32) -> [u8; 16] {
    u128::from_be_bytes(*a).rotate_left(n).to_be_bytes()
}

fn sl1(x: &[u8; 16]) -> [u8; 16] {
    let mut y = [0u8; 16];
    for (i, yi) in y.iter_mut().enumerate() {
        *yi = match i % 4 {
            0 => SB1[x[i] as usize],
            1 => SB2[x[i] as usize],
            2 => SB3[x[i] as usize],
            _ => SB4[x[i] as usize],
        };
    }
    y
}

fn sl2(x: &[u8; 16]) -> [u8; 16] {
    let mut y = [0u8; 16];
    for (i, yi) in y.iter_mut().enumerate() {
        *yi = match i % 4 {
            0 => SB3[x[i] as usize],
            1 => SB4[x[i] as usize],
            2 => SB1[x[i] as usize],
            _ => SB2[x[i] as usize],
        };
    }
    y
}

/// The diffusion layer `A`, an involution (`A(A(x)) == x`).
#[rustfmt::skip]
fn diffuse(x: &[u8; 16]) -> [u8; 16] {
    [
        x[3] ^ x[4] ^ x[6] ^ x[8] ^ x[9] ^ x[13] ^ x[14],
        x[2] ^ x[5] ^ x[7] ^ x[8] ^ x[9] ^ x[12] ^ x[15],
        x[1] ^ x[4] ^ x[6] ^ x[10] ^ x[11] ^ x[12] ^ x[15],
        x[0] ^ x[5] ^ x[7] ^ x[10] ^ x[11] ^ x[13] ^ x[14],
        x[0] ^ x[2] ^ x[5] ^ x[8] ^ x[11] ^ x[14] ^ x[15],
        x[1] ^ x[3] ^ x[4] ^ x[9] ^ x[10] ^ x[14] ^ x[15],
        x[0] ^ x[2] ^ x[7] ^ x[9] ^ x[10] ^ x[12] ^ x[13],
        x[1] ^ x[3] ^ x[6] ^ x[8] ^ x[11] ^ x[12] ^ x[13],
        x[0] ^ x[1] ^ x[4] ^ x[7] ^ x[10] ^ x[13] ^ x[15],
        x[0] ^ x[1] ^ x[5] ^ x[6] ^ x[11] ^ x[12] ^ x[14],
        x[2] ^ x[3] ^ x[5] ^ x[6] ^ x[8] ^ x[13] ^ x[15],
        x[2] ^ x[3] ^ x[4] ^ x[7] ^ x[9] ^ x[12] ^ x[14],
        x[1] ^ x[2] ^ x[6] ^ x[7] ^ x[9] ^ x[11] ^ x[12],
        x[0] ^ x[3] ^ x[6] ^ x[7] ^ x[8] ^ x[10] ^ x[13],
        x[0] ^ x[3] ^ x[4] ^ x[5] ^ x[9] ^ x[11] ^ x[14],
        x[1] ^ x[2] ^ x[4] ^ x[5] ^ x[8] ^ x[10] ^ x[15],
    ]
}

/// Odd round function: `A(SL1(D xor RK))`.
fn of(d: &[u8; 16], rk: &[u8; 16]) -> [u8; 16] {
    diffuse(&sl1(&xor128(d, rk)))
}

/// Even round function: `A(SL2(D xor RK))`.
fn ef(d: &[u8; 16], rk: &[u8; 16]) -> [u8; 16] {
    diffuse(&sl2(&xor128(d, rk)))
}

/// Expanded key schedule for one ARIA key.
#[derive(Debug, Clone)]
pub struct Context {
    nr: usize,
    ek: Vec<[u8; 16]>,
    dk: Vec<[u8; 16]>,
}

/// The ARIA block cipher (RFC 5794).
pub struct Aria;

impl CipherAlgo for Aria {
    const NAME: &'static str = "ARIA";
    const BLOCK_SIZE: usize = BLOCK_SIZE;
    type Context = Context;

    fn init(key: &[u8]) -> Result<Context, Error> {
        let nr = match key.len() {
            16 => 12,
            24 => 14,
            32 => 16,
            _ => return Err(Error::InvalidKeyLength),
        };

        let (ck1, ck2, ck3) = match key.len() {
            16 => (&CK1, &CK2, &CK3),
            24 => (&CK2, &CK3, &CK1),
            _ => (&CK3, &CK1, &CK2),
        };

        let mut kl = [0u8; 16];
        let mut kr = [0u8; 16];
        kl.copy_from_slice(&key[0..16]);
        kr[..key.len() - 16].copy_from_slice(&key[16..]);

        let w0 = kl;
        let w1 = xor128(&of(&w0, ck1), &kr);
        let w2 = xor128(&ef(&w1, ck2), &w0);
        let w3 = xor128(&of(&w2, ck3), &w1);

        // ek_i for i = 1..=17, four rotation amounts of four keys each plus
        // one extra (RFC 5794 section 2.3).
        let rotations = [109u32, 97, 61, 31];
        let words = [w0, w1, w2, w3];

        let mut ek = Vec::with_capacity(17);
        for &n in &rotations {
            for i in 0..4 {
                let rotated = rol128(&words[(i + 1) % 4], n);
                ek.push(xor128(&rotated, &words[i]));
            }
        }
        ek.push(xor128(&rol128(&words[1], 19), &words[0]));

        let mut dk = vec![[0u8; 16]; nr + 1];
        dk[0] = ek[nr];
        for i in 1..nr {
            dk[i] = diffuse(&ek[nr - i]);
        }
        dk[nr] = ek[0];

        Ok(Context { nr, ek, dk })
    }

    fn encrypt_block(ctx: &Context, input: &[u8], output: &mut [u8]) {
        let mut block = [0u8; 16];
        block.copy_from_slice(&input[..16]);
        let result = transform(&block, &ctx.ek, ctx.nr);
        output[..16].copy_from_slice(&result);
    }

    fn decrypt_block(ctx: &Context, input: &[u8], output: &mut [u8]) {
        let mut block = [0u8; 16];
        block.copy_from_slice(&input[..16]);
        let result = transform(&block, &ctx.dk, ctx.nr);
        output[..16].copy_from_slice(&result);
    }
}

/// Runs the 11 fixed OF/EF rounds followed by the size-dependent tail.
/// Shared between encryption and decryption: only the round key array
/// (`ek` vs `dk`) differs.
fn transform(input: &[u8; 16], rk: &[[u8; 16]], nr: usize) -> [u8; 16] {
    let mut p = of(input, &rk[0]);
    p = ef(&p, &rk[1]);
    p = of(&p, &rk[2]);
    p = ef(&p, &rk[3]);
    p = of(&p, &rk[4]);
    p = ef(&p, &rk[5]);
    p = of(&p, &rk[6]);
    p = ef(&p, &rk[7]);
    p = of(&p, &rk[8]);
    p = ef(&p, &rk[9]);
    p = of(&p, &rk[10]);

    match nr {
        12 => {
            let p = xor128(&p, &rk[11]);
            xor128(&sl2(&p), &rk[12])
        }
        14 => {
            let p = ef(&p, &rk[11]);
            let p = of(&p, &rk[12]);
            let p = xor128(&p, &rk[13]);
            xor128(&sl2(&p), &rk[14])
        }
        _ => {
            let p = ef(&p, &rk[11]);
            let p = of(&p, &rk[12]);
            let p = ef(&p, &rk[13]);
            let p = of(&p, &rk[14]);
            let p = xor128(&p, &rk[15]);
            xor128(&sl2(&p), &rk[16])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn rejects_invalid_key_length() {
        assert!(matches!(Aria::init(&[0u8; 10]), Err(Error::InvalidKeyLength)));
        assert!(matches!(Aria::init(&[0u8; 20]), Err(Error::InvalidKeyLength)));
    }

    #[test]
    fn rfc5794_128_bit_test_vector() {
        let key = hex("000102030405060708090a0b0c0d0e0f");
        let pt = hex("00112233445566778899aabbccddeeff");
        let ct = hex("d718fbd6ab644c739da95f3be6451778");

        let ctx = Aria::init(&key).unwrap();
        let mut out = [0u8; 16];
        Aria::encrypt_block(&ctx, &pt, &mut out);
        assert_eq!(out.to_vec(), ct);

        let mut back = [0u8; 16];
        Aria::decrypt_block(&ctx, &out, &mut back);
        assert_eq!(back.to_vec(), pt);
    }

    #[test]
    fn rfc5794_192_bit_test_vector() {
        let key = hex("000102030405060708090a0b0c0d0e0f1011121314151617");
        let pt = hex("00112233445566778899aabbccddeeff");
        let ct = hex("26449c1805dbe7aa25a468ce263a9e79");

        let ctx = Aria::init(&key).unwrap();
        let mut out = [0u8; 16];
        Aria::encrypt_block(&ctx, &pt, &mut out);
        assert_eq!(out.to_vec(), ct);

        let mut back = [0u8; 16];
        Aria::decrypt_block(&ctx, &out, &mut back);
        assert_eq!(back.to_vec(), pt);
    }

    #[test]
    fn rfc5794_256_bit_test_vector() {
        let key = hex("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let pt = hex("00112233445566778899aabbccddeeff");
        let ct = hex("f92bd7c79fb72e2f2b8f80c1972d24fc");

        let ctx = Aria::init(&key).unwrap();
        let mut out = [0u8; 16];
        Aria::encrypt_block(&ctx, &pt, &mut out);
        assert_eq!(out.to_vec(), ct);

        let mut back = [0u8; 16];
        Aria::decrypt_block(&ctx, &out, &mut back);
        assert_eq!(back.to_vec(), pt);
    }

    #[test]
    fn round_trips_for_every_key_size() {
        for key_len in [16usize, 24, 32] {
            let key: Vec<u8> = (0..key_len as u8).collect();
            let ctx = Aria::init(&key).unwrap();

            let pt = [0xAAu8; 16];
            let mut ct = [0u8; 16];
            Aria::encrypt_block(&ctx, &pt, &mut ct);
            assert_ne!(ct, pt);

            let mut back = [0u8; 16];
            Aria::decrypt_block(&ctx, &ct, &mut back);
            assert_eq!(back, pt);
        }
    }

    #[test]
    fn different_keys_produce_different_ciphertext() {
        let pt = [0x11u8; 16];
        let ctx_a = Aria::init(&[0u8; 16]).unwrap();
        let ctx_b = Aria::init(&[1u8; 16]).unwrap();

        let mut ct_a = [0u8; 16];
        let mut ct_b = [0u8; 16];
        Aria::encrypt_block(&ctx_a, &pt, &mut ct_a);
        Aria::encrypt_block(&ctx_b, &pt, &mut ct_b);

        assert_ne!(ct_a, ct_b);
    }
}
