//! Integration test reproducing the check sequence of a small-MCU `secretbox`
//! test harness: for each `(key, nonce, plaintext)` entry, verify that
//! subkey derivation is consistent between the low-level and extended-nonce
//! entry points, that a single-bit tag tamper is rejected without touching
//! the buffer, and that decryption recovers the original plaintext.
//!
//! Upstream test harnesses of this shape are usually driven by an external
//! `K/N/P/C/A` hex vector file; no such file ships with this crate; the
//! entries below are generated in-test rather than taken from an external
//! fixture, but each case still walks exactly the sequence above.

use xsalsa20poly1305::{open_extended, seal, seal_extended, Error, KEY_SIZE, NONCE_SIZE, XNONCE_SIZE};

struct Case {
    key: [u8; KEY_SIZE],
    xnonce: [u8; XNONCE_SIZE],
    plaintext: &'static [u8],
}

const CASES: &[Case] = &[
    Case {
        key: [0u8; KEY_SIZE],
        xnonce: [0u8; XNONCE_SIZE],
        plaintext: b"",
    },
    Case {
        key: *b"01234567890123456789012345678901",
        xnonce: *b"012345678901234567890123",
        plaintext: b"hello",
    },
    Case {
        key: [0xffu8; KEY_SIZE],
        xnonce: [0x42u8; XNONCE_SIZE],
        plaintext: b"a message that spans more than one sixty-four byte keystream block, to exercise the multi-block path",
    },
];

fn short_nonce(xnonce: &[u8; XNONCE_SIZE]) -> [u8; NONCE_SIZE] {
    let mut n = [0u8; NONCE_SIZE];
    n.copy_from_slice(&xnonce[xnonce.len() - NONCE_SIZE..]);
    n
}

fn hnonce(xnonce: &[u8; XNONCE_SIZE]) -> [u8; 16] {
    let mut n = [0u8; 16];
    n.copy_from_slice(&xnonce[..16]);
    n
}

#[test]
fn extended_nonce_subkey_derivation_is_consistent() {
    for case in CASES {
        let mut subkey = [0u8; KEY_SIZE];
        salsa20_core::xsalsa20_subkey(&mut subkey, &case.key, &hnonce(&case.xnonce));

        let mut via_manual = case.plaintext.to_vec();
        let tag_manual = seal(&mut via_manual, &subkey, &short_nonce(&case.xnonce));

        let mut via_extended = case.plaintext.to_vec();
        let tag_extended = seal_extended(&mut via_extended, &case.key, &case.xnonce);

        assert_eq!(tag_manual, tag_extended);
        assert_eq!(via_manual, via_extended);
    }
}

#[test]
fn seal_generates_then_rejects_tamper_then_decrypts() {
    for case in CASES {
        let mut buf = case.plaintext.to_vec();
        let tag = seal_extended(&mut buf, &case.key, &case.xnonce);
        let ciphertext = buf.clone();

        let mut bad_tag = tag;
        bad_tag[0] ^= 1;

        let mut attempt = ciphertext.clone();
        let result = open_extended(&mut attempt, &bad_tag, &case.key, &case.xnonce);
        assert_eq!(result, Err(Error));
        assert_eq!(attempt, ciphertext, "buffer must be untouched after a rejected tag");

        let mut attempt = ciphertext.clone();
        open_extended(&mut attempt, &tag, &case.key, &case.xnonce).expect("valid tag must verify");
        assert_eq!(attempt, case.plaintext);
    }
}
