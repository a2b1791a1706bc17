//! `secretbox`: XSalsa20 keystream encryption combined with Poly1305
//! authentication, sized for resource-constrained targets.
//!
//! This crate composes [`salsa20_core`] and [`poly1305`] into the NaCl
//! `crypto_secretbox` construction: the first 32 bytes of Salsa20 keystream
//! block 0 are reserved to derive the Poly1305 one-time key `(r, s)`; the
//! message is encrypted starting at byte 32 of that same block (and any
//! subsequent blocks, for longer messages); the resulting ciphertext is
//! authenticated with Poly1305.
//!
//! Two nonce sizes are supported:
//!
//! - [`seal`]/[`open`] take an 8-byte nonce directly, matching the
//!   low-level `crypto_secretbox_xsalsa20poly1305` primitive.
//! - [`seal_extended`]/[`open_extended`] take a 24-byte extended nonce,
//!   deriving a per-message session subkey via XSalsa20/HSalsa20 before
//!   delegating to the 8-byte-nonce primitives — the same relationship
//!   NaCl's own `crypto_secretbox` has to its `xsalsa20poly1305` variant.
//!   Prefer these unless you have a specific reason to manage the subkey
//!   derivation step yourself, since a 24-byte nonce can be chosen at
//!   random with a negligible collision probability, whereas an 8-byte
//!   nonce generally requires a counter.
//!
//! # Wire format
//!
//! A sealed message is `ciphertext || tag` — the ciphertext is the same
//! length as the plaintext, followed by a 16-byte tag. This differs from
//! NaCl's own `crypto_secretbox`, which additionally requires a 32-byte
//! zero-padding prefix on the plaintext and a 16-byte zero prefix on the
//! ciphertext; callers who need byte-for-byte NaCl wire compatibility must
//! add that padding themselves.
//!
//! # ⚠️ Security Warning
//!
//! The nonce passed to [`seal`]/[`seal_extended`] MUST be unique for every
//! message sealed under the same key. Reusing a nonce (with [`seal`]
//! especially, since its 8-byte nonce space is small) breaks both
//! confidentiality and authenticity.
//!
//! This crate supports messages up to `(2^16 - 1) * 64 + 32` bytes (just
//! under 1 MiB) — see [`salsa20_core::keystream_block`]'s docs for why.
//! Exceeding that bound is undefined behavior; this crate does not check
//! for it.

#![no_std]
#![warn(missing_docs, rust_2018_idioms, trivial_casts, unused_qualifications)]

use salsa20_core::{BLOCK_SIZE, HNONCE_SIZE};

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// Size of the secretbox key, in bytes.
pub const KEY_SIZE: usize = salsa20_core::KEY_SIZE;
/// Size of the short (non-extended) nonce, in bytes.
pub const NONCE_SIZE: usize = salsa20_core::NONCE_SIZE;
/// Size of the extended (XSalsa20) nonce, in bytes.
pub const XNONCE_SIZE: usize = HNONCE_SIZE + NONCE_SIZE;
/// Size of the authentication tag, in bytes.
pub const TAG_SIZE: usize = poly1305::TAG_SIZE;

/// Authentication failure.
///
/// Returned by [`open`]/[`open_extended`] when the supplied tag does not
/// match the ciphertext. Carries no further detail by design: disclosing
/// *why* verification failed (mismatched length, wrong key vs. tampered
/// ciphertext, etc.) would itself be a side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("xsalsa20poly1305: authentication failed")
    }
}

/// Derive the Poly1305 one-time key `(r, s)` from keystream block 0 and
/// return it alongside that block, clamping `r` in place.
fn derive_mac_key(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
) -> ([u8; BLOCK_SIZE], [u8; poly1305::R_SIZE], [u8; poly1305::S_SIZE]) {
    let ks0 = salsa20_core::keystream_block(key, nonce, 0);

    let mut r: [u8; poly1305::R_SIZE] = ks0[..16].try_into().unwrap();
    let s: [u8; poly1305::S_SIZE] = ks0[16..32].try_into().unwrap();
    poly1305::prepare_r(&mut r);

    (ks0, r, s)
}

/// XOR the Salsa20 keystream for `(key, nonce)` into `message` in place,
/// reserving the first 32 bytes of keystream block 0 for the Poly1305 MAC
/// key (already extracted by the caller via [`derive_mac_key`]).
fn xor_keystream(message: &mut [u8], key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], ks0: &[u8; BLOCK_SIZE]) {
    let len = message.len();

    if len <= 32 {
        for (m, k) in message.iter_mut().zip(&ks0[32..32 + len]) {
            *m ^= *k;
        }
        return;
    }

    let (head, mut rest) = message.split_at_mut(32);
    for (m, k) in head.iter_mut().zip(&ks0[32..64]) {
        *m ^= *k;
    }

    let mut index: u16 = 1;
    while rest.len() > 64 {
        let ks = salsa20_core::keystream_block(key, nonce, index);
        index += 1;

        let (chunk, tail) = rest.split_at_mut(64);
        for (m, k) in chunk.iter_mut().zip(ks.iter()) {
            *m ^= *k;
        }
        rest = tail;
    }

    let ks = salsa20_core::keystream_block(key, nonce, index);
    for (m, k) in rest.iter_mut().zip(ks.iter()) {
        *m ^= *k;
    }
}

/// Encrypt `message` in place under `(key, nonce)` and return its
/// authentication tag.
///
/// `nonce` MUST be unique for every message sealed under `key`.
pub fn seal(message: &mut [u8], key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) -> [u8; TAG_SIZE] {
    let (ks0, r, s) = derive_mac_key(key, nonce);

    xor_keystream(message, key, nonce, &ks0);
    let tag = poly1305::eval(&r, &s, message);

    #[cfg(feature = "zeroize")]
    {
        let mut ks0 = ks0;
        let mut r = r;
        ks0.zeroize();
        r.zeroize();
    }

    tag
}

/// Verify `tag` against `message` (treated as ciphertext) under
/// `(key, nonce)`, and decrypt `message` in place on success.
///
/// On authentication failure, `message` is left byte-for-byte unchanged —
/// no partial decryption is ever written.
pub fn open(
    message: &mut [u8],
    tag: &[u8; TAG_SIZE],
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
) -> Result<(), Error> {
    let (ks0, r, s) = derive_mac_key(key, nonce);
    let computed = poly1305::eval(&r, &s, message);

    let authentic = poly1305::compare(&computed, tag);

    #[cfg(feature = "zeroize")]
    {
        let mut r = r;
        r.zeroize();
    }

    if !bool::from(authentic) {
        return Err(Error);
    }

    xor_keystream(message, key, nonce, &ks0);

    #[cfg(feature = "zeroize")]
    {
        let mut ks0 = ks0;
        ks0.zeroize();
    }

    Ok(())
}

/// Encrypt `message` in place under `(key, nonce)` using a 24-byte extended
/// nonce, deriving a fresh session subkey via XSalsa20 first.
pub fn seal_extended(message: &mut [u8], key: &[u8; KEY_SIZE], nonce: &[u8; XNONCE_SIZE]) -> [u8; TAG_SIZE] {
    let (mut subkey, short_nonce) = extended_subkey(key, nonce);
    let tag = seal(message, &subkey, &short_nonce);

    #[cfg(feature = "zeroize")]
    subkey.zeroize();

    tag
}

/// Verify and decrypt `message` in place under `(key, nonce)` using a
/// 24-byte extended nonce, deriving the session subkey via XSalsa20 first.
pub fn open_extended(
    message: &mut [u8],
    tag: &[u8; TAG_SIZE],
    key: &[u8; KEY_SIZE],
    nonce: &[u8; XNONCE_SIZE],
) -> Result<(), Error> {
    let (mut subkey, short_nonce) = extended_subkey(key, nonce);
    let result = open(message, tag, &subkey, &short_nonce);

    #[cfg(feature = "zeroize")]
    subkey.zeroize();

    result
}

fn extended_subkey(key: &[u8; KEY_SIZE], nonce: &[u8; XNONCE_SIZE]) -> ([u8; KEY_SIZE], [u8; NONCE_SIZE]) {
    let mut nonce16 = [0u8; HNONCE_SIZE];
    nonce16.copy_from_slice(&nonce[..HNONCE_SIZE]);
    let mut nonce8 = [0u8; NONCE_SIZE];
    nonce8.copy_from_slice(&nonce[HNONCE_SIZE..]);

    let mut subkey = [0u8; KEY_SIZE];
    salsa20_core::xsalsa20_subkey(&mut subkey, key, &nonce16);

    (subkey, nonce8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip_all_zeros() {
        let key = [0u8; KEY_SIZE];
        let nonce = [0u8; NONCE_SIZE];
        let plaintext = [0u8; 64];

        let mut buf = plaintext;
        let tag = seal(&mut buf, &key, &nonce);

        let ciphertext = buf;
        open(&mut buf, &tag, &key, &nonce).expect("seal/open round trip");
        assert_eq!(buf, plaintext);

        // Tamper rejection: flip the low bit of tag byte 0.
        let mut bad_tag = tag;
        bad_tag[0] ^= 1;

        let mut buf = ciphertext;
        let err = open(&mut buf, &bad_tag, &key, &nonce);
        assert_eq!(err, Err(Error));
        assert_eq!(buf, ciphertext, "buffer must be untouched on auth failure");
    }

    #[test]
    fn seal_empty_message() {
        let key = [0x11u8; KEY_SIZE];
        let nonce = [0x22u8; NONCE_SIZE];
        let mut buf: [u8; 0] = [];

        let tag = seal(&mut buf, &key, &nonce);
        open(&mut buf, &tag, &key, &nonce).expect("empty message round trip");
    }

    #[test]
    fn ciphertext_tamper_is_rejected() {
        let key = [0x33u8; KEY_SIZE];
        let nonce = [0x44u8; NONCE_SIZE];
        let plaintext = *b"the quick brown fox jumps over the lazy dog, 37";

        let mut buf = plaintext;
        let tag = seal(&mut buf, &key, &nonce);

        buf[0] ^= 1;
        assert_eq!(open(&mut buf, &tag, &key, &nonce), Err(Error));
    }

    #[test]
    fn round_trip_across_boundary_lengths() {
        let key = [0xa5u8; KEY_SIZE];
        let nonce = [0x5au8; NONCE_SIZE];

        let mut storage = [0u8; 200];
        for (i, b) in storage.iter_mut().enumerate() {
            *b = i as u8;
        }

        for len in [0usize, 1, 16, 17, 31, 32, 33, 64, 65, 96, 97, 200] {
            let original = storage;
            let mut buf = storage;

            let tag = seal(&mut buf[..len], &key, &nonce);
            open(&mut buf[..len], &tag, &key, &nonce).unwrap();

            assert_eq!(&buf[..len], &original[..len], "length {len} failed to round-trip");
        }
    }

    #[test]
    fn extended_nonce_round_trip() {
        let key = [0x7eu8; KEY_SIZE];
        let nonce = [0x9bu8; XNONCE_SIZE];
        let plaintext = *b"extended nonce secretbox message";

        let mut buf = plaintext;
        let tag = seal_extended(&mut buf, &key, &nonce);
        open_extended(&mut buf, &tag, &key, &nonce).unwrap();

        assert_eq!(buf, plaintext);
    }

    #[test]
    fn extended_nonce_matches_manual_subkey_derivation() {
        let key = [0x01u8; KEY_SIZE];
        let nonce = [0x02u8; XNONCE_SIZE];
        let plaintext = *b"cross-check against manual derivation";

        let mut via_extended = plaintext;
        let tag_extended = seal_extended(&mut via_extended, &key, &nonce);

        let mut nonce16 = [0u8; HNONCE_SIZE];
        nonce16.copy_from_slice(&nonce[..HNONCE_SIZE]);
        let mut nonce8 = [0u8; NONCE_SIZE];
        nonce8.copy_from_slice(&nonce[HNONCE_SIZE..]);
        let mut subkey = [0u8; KEY_SIZE];
        salsa20_core::xsalsa20_subkey(&mut subkey, &key, &nonce16);

        let mut via_manual = plaintext;
        let tag_manual = seal(&mut via_manual, &subkey, &nonce8);

        assert_eq!(tag_extended, tag_manual);
        assert_eq!(via_extended, via_manual);
    }
}
