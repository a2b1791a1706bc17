//! Poly1305, a one-time message-authentication code, evaluated with 8-bit
//! limbs and a 16-bit carry accumulator.
//!
//! Poly1305 splits a message into 16-byte chunks (each prepended with an
//! implicit leading `1` byte), treats them as the coefficients of a
//! polynomial, evaluates that polynomial at a secret point `r` modulo the
//! prime `p = 2^130 - 5`, and adds a one-time pad `s`. Given a string of
//! bytes and a secret pair `(r, s)`, it produces a 128-bit authenticator.
//!
//! The limb width here is deliberately 8 bits rather than the wider radix
//! (e.g. 26-bit) used by most desktop-class Poly1305 implementations: the
//! target audience for this crate includes 8-bit microcontrollers without a
//! fast 32-bit multiplier, where a byte-at-a-time schoolbook multiply is the
//! more economical choice.
//!
//! `r` and `s` must be secret, and `s` must never be reused. Neither
//! requirement is enforced by this crate; see the [`xsalsa20poly1305`] crate
//! for a composition that derives a fresh `(r, s)` per message.
//!
//! # ⚠️ Security Warning: Hazmat!
//!
//! Poly1305 is a *one-time* authenticator. Reusing `(r, s)` across two
//! different messages lets an attacker forge tags. This crate does not
//! detect reuse.
//!
//! [`xsalsa20poly1305`]: https://docs.rs/xsalsa20poly1305

#![no_std]
#![warn(missing_docs, rust_2018_idioms, trivial_casts, unused_qualifications)]

use subtle::ConstantTimeEq;

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// Size of the Poly1305 `r` parameter, in bytes.
pub const R_SIZE: usize = 16;
/// Size of the Poly1305 `s` parameter, in bytes.
pub const S_SIZE: usize = 16;
/// Size of a Poly1305 authentication tag, in bytes.
pub const TAG_SIZE: usize = 16;

/// Width of the accumulator `h`, in bytes: 130 bits rounded up to a whole
/// number of limbs, plus one byte of carry headroom.
const ACC_SIZE: usize = 17;

/// Clamp `r` in place so that it satisfies the constraints Poly1305
/// multiplication relies on to bound intermediate products during
/// reduction: the top nibble of bytes 3, 7, 11, and 15 is cleared, and the
/// bottom two bits of bytes 4, 8, and 12 are cleared.
pub fn prepare_r(r: &mut [u8; R_SIZE]) {
    r[3] &= 15;
    r[7] &= 15;
    r[11] &= 15;
    r[15] &= 15;

    r[4] &= 252;
    r[8] &= 252;
    r[12] &= 252;
}

/// Add `(2^(8*len) + m)` into the accumulator `h`, modulo 2^136.
///
/// The `2^(8*len)` term is the implicit leading `1` byte Poly1305 prepends
/// to every message chunk. This can't overflow `h`'s 17 bytes: the leading
/// term is at most 129 bits and `h` is at most 131 bits going in.
fn add_chunk(h: &mut [u8; ACC_SIZE], chunk: &[u8]) {
    let len = chunk.len();
    let mut carry: u16 = 0;

    for i in 0..len {
        carry += u16::from(h[i]) + u16::from(chunk[i]);
        h[i] = carry as u8;
        carry >>= 8;
    }

    // Leading 1 byte.
    carry += u16::from(h[len]) + 1;
    h[len] = carry as u8;
    carry >>= 8;

    for byte in h.iter_mut().skip(len + 1) {
        carry += u16::from(*byte);
        *byte = carry as u8;
        carry >>= 8;
    }
}

/// Multiply the 17-byte accumulator `h` by the 16-byte clamped `r`, modulo
/// `p = 2^130 - 5`.
///
/// Computes the full 33-byte schoolbook product, then folds it down to 17
/// bytes in two stages: first using `2^136 ≡ 320 = 2^8 + 2^6 (mod p)` to fold
/// the upper 16 product bytes into the lower 17, then using
/// `2^130 ≡ 5 (mod p)` to fold the single leftover bit pair back in. The
/// result is bounded by `2^130 + 1274`, comfortably within the 17-byte
/// accumulator.
fn mul_modp(h: &mut [u8; ACC_SIZE], r: &[u8; R_SIZE]) {
    let mut product = [0u8; 33];

    for i in 0..16 {
        let d = u16::from(r[i]);
        let mut carry: u16 = 0;

        for j in 0..ACC_SIZE {
            carry += d * u16::from(h[j]) + u16::from(product[i + j]);
            product[i + j] = carry as u8;
            carry >>= 8;
        }

        let mut k = i + ACC_SIZE;
        while k < 33 {
            carry += u16::from(product[k]);
            product[k] = carry as u8;
            carry >>= 8;
            k += 1;
        }
    }

    // First fold: 2^136 = 320 = 2^8 + 2^6 (mod p).
    let mut carry: u16 = u16::from(product[0]) + (u16::from(product[17]) << 6);
    product[0] = carry as u8;
    carry >>= 8;

    for i in 1..16 {
        carry += u16::from(product[i]) + u16::from(product[i + 16]) + (u16::from(product[i + 17]) << 6);
        product[i] = carry as u8;
        carry >>= 8;
    }

    carry += u16::from(product[16]) + u16::from(product[32]);
    product[16] = (carry & 3) as u8;
    carry >>= 2;

    // Second fold: 2^130 = 5 (mod p).
    carry += carry << 2;

    for i in 0..ACC_SIZE {
        carry += u16::from(product[i]);
        h[i] = carry as u8;
        carry >>= 8;
    }
}

/// Add the one-time pad `s` into the lower 16 bytes of `h`, propagating the
/// final carry into byte 16.
///
/// Given the precondition `h <= 2^130 + 1274` (guaranteed by [`mul_modp`])
/// and `s < 2^128`, the result satisfies `h + s < 2*p`, which [`reduce`] can
/// fully reduce with a single conditional subtraction.
fn add_nonce(h: &mut [u8; ACC_SIZE], s: &[u8; S_SIZE]) {
    let mut carry: u16 = 0;

    for i in 0..S_SIZE {
        carry += u16::from(h[i]) + u16::from(s[i]);
        h[i] = carry as u8;
        carry >>= 8;
    }

    h[16] = carry as u8;
}

/// Reduce `h < 2*p` to `out = h mod p`, in constant time.
///
/// Computes `h + 5 - 2^130` (i.e. `h - p`) alongside `h` itself, then
/// branchlessly selects between the two based on whether the subtraction
/// underflowed. The selection mask must never be allowed to depend on
/// secret data through a conditional branch or table lookup.
fn reduce(out: &mut [u8; TAG_SIZE], h: &[u8; ACC_SIZE]) {
    let mut candidate = [0u8; TAG_SIZE];
    let mut carry: u16 = 5;

    for i in 0..TAG_SIZE {
        carry += u16::from(h[i]);
        candidate[i] = carry as u8;
        carry >>= 8;
    }

    carry = carry.wrapping_add(u16::from(h[16])).wrapping_sub(4);
    let is_negative = 0u8.wrapping_sub(((carry >> 15) & 1) as u8);

    for i in 0..TAG_SIZE {
        out[i] = candidate[i] ^ (is_negative & (h[i] ^ candidate[i]));
    }
}

/// Evaluate the Poly1305 MAC of `message` under `(r, s)`.
///
/// `r` must already be clamped (see [`prepare_r`]). Both `r` and `s` should
/// be secret and used for exactly one message.
pub fn eval(r: &[u8; R_SIZE], s: &[u8; S_SIZE], message: &[u8]) -> [u8; TAG_SIZE] {
    let mut h = [0u8; ACC_SIZE];

    let mut chunks = message.chunks_exact(16);
    for chunk in &mut chunks {
        add_chunk(&mut h, chunk);
        mul_modp(&mut h, r);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        add_chunk(&mut h, remainder);
        mul_modp(&mut h, r);
    }

    add_nonce(&mut h, s);

    let mut tag = [0u8; TAG_SIZE];
    reduce(&mut tag, &h);

    #[cfg(feature = "zeroize")]
    h.zeroize();

    tag
}

/// Compare two tags in constant time.
///
/// Returns a [`subtle::Choice`] that is true iff `a == b`. Never short-circuits
/// on the first differing byte, so execution time does not leak which byte
/// (if any) first differed.
pub fn compare(a: &[u8; TAG_SIZE], b: &[u8; TAG_SIZE]) -> subtle::Choice {
    a.ct_eq(b)
}
