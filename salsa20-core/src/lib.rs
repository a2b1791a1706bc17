//! Salsa20 and HSalsa20 core primitives for small, resource-constrained targets.
//!
//! This crate provides the bare permutation and keystream-adapter layer that
//! [`xsalsa20poly1305`](https://docs.rs/xsalsa20poly1305) builds its secretbox
//! construction on top of. Unlike the `salsa20` crate, it does not implement a
//! streaming/seekable cipher object: every function here takes a complete
//! 64-byte block (or the inputs to build one) and returns a complete result,
//! which keeps the whole crate allocation-free and suitable for 8-bit targets
//! with no 32-bit hardware multiplier.
//!
//! # ⚠️ Security Warning: Hazmat!
//!
//! These are raw primitives. Neither `salsa20_block` nor `keystream_block`
//! authenticates anything; pair keystream output with a MAC (see the
//! `poly1305` crate) before trusting it for anything beyond obfuscation.

#![no_std]
#![warn(missing_docs, rust_2018_idioms, trivial_casts, unused_qualifications)]

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// Size of a Salsa20 key, in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of a (short) Salsa20 nonce, in bytes.
pub const NONCE_SIZE: usize = 8;
/// Size of the HSalsa20 input nonce half, in bytes.
pub const HNONCE_SIZE: usize = 16;
/// Size of a Salsa20/HSalsa20 input or output block, in bytes.
pub const BLOCK_SIZE: usize = 64;
/// Size of the HSalsa20 output (subkey), in bytes.
pub const HSALSA20_OUTPUT_SIZE: usize = 32;

/// Number of 32-bit words in the Salsa20 state.
const STATE_WORDS: usize = 16;

/// State initialization constant ("expand 32-byte k").
const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// Load the default Salsa20 constant ("expand 32-byte k") into the four
/// constant-word slots of an input block (offsets 0, 5, 10, 15).
fn load_constants(block: &mut [u8; BLOCK_SIZE]) {
    for (i, word) in CONSTANTS.iter().enumerate() {
        let offset = i * 20;
        block[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
    }
}

/// Load a 32-byte key into the eight key-word slots (bytes 4..19, 44..59).
fn load_key(block: &mut [u8; BLOCK_SIZE], key: &[u8; KEY_SIZE]) {
    block[4..20].copy_from_slice(&key[..16]);
    block[44..60].copy_from_slice(&key[16..]);
}

/// Load an 8-byte nonce into the first half of the input-word slots
/// (bytes 24..32), leaving the counter half (bytes 32..40) untouched.
fn load_nonce(block: &mut [u8; BLOCK_SIZE], nonce: &[u8; NONCE_SIZE]) {
    block[24..32].copy_from_slice(nonce);
}

/// Load a 16-byte HSalsa20 nonce into the full input-word region
/// (bytes 24..40), used for subkey derivation.
fn load_hnonce(block: &mut [u8; BLOCK_SIZE], nonce: &[u8; HNONCE_SIZE]) {
    block[24..40].copy_from_slice(nonce);
}

fn words_from_block(block: &[u8; BLOCK_SIZE]) -> [u32; STATE_WORDS] {
    let mut state = [0u32; STATE_WORDS];
    for (word, chunk) in state.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    state
}

#[inline]
fn quarter_round(a: usize, b: usize, c: usize, d: usize, state: &mut [u32; STATE_WORDS]) {
    state[b] ^= state[a].wrapping_add(state[d]).rotate_left(7);
    state[c] ^= state[b].wrapping_add(state[a]).rotate_left(9);
    state[d] ^= state[c].wrapping_add(state[b]).rotate_left(13);
    state[a] ^= state[d].wrapping_add(state[c]).rotate_left(18);
}

/// Run the 20 rounds (10 double-rounds) of the Salsa20 permutation over
/// `state`, returning the permuted state (without the final feed-forward
/// add, which only applies to plain Salsa20, not HSalsa20).
fn permute(state: &[u32; STATE_WORDS]) -> [u32; STATE_WORDS] {
    let mut x = *state;

    for _ in 0..10 {
        // column rounds
        quarter_round(0, 4, 8, 12, &mut x);
        quarter_round(5, 9, 13, 1, &mut x);
        quarter_round(10, 14, 2, 6, &mut x);
        quarter_round(15, 3, 7, 11, &mut x);

        // row rounds
        quarter_round(0, 1, 2, 3, &mut x);
        quarter_round(5, 6, 7, 4, &mut x);
        quarter_round(10, 11, 8, 9, &mut x);
        quarter_round(15, 12, 13, 14, &mut x);
    }

    x
}

/// The Salsa20 core permutation.
///
/// Given a 64-byte input block laid out as `C K K K K C I I I I C K K K K C`
/// (4 constant words, 8 key words, 4 input words, little-endian throughout),
/// runs the 20-round permutation and adds the result back to the input
/// (wrapping, word-wise), producing the 64-byte keystream block.
pub fn salsa20_block(input: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let initial = words_from_block(input);
    let permuted = permute(&initial);

    let mut out = [0u8; BLOCK_SIZE];
    for (i, (p, s)) in permuted.iter().zip(initial.iter()).enumerate() {
        let word = p.wrapping_add(*s);
        out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }

    #[cfg(feature = "zeroize")]
    {
        let mut initial = initial;
        initial.zeroize();
    }

    out
}

/// The HSalsa20 function.
///
/// Runs the same 20-round permutation as [`salsa20_block`], but instead of
/// adding the result back to the input, emits 32 bytes drawn directly from
/// state words `[0, 5, 10, 15, 6, 7, 8, 9]`. Used exclusively to derive an
/// XSalsa20 session subkey from a key and the first 16 bytes of an extended
/// nonce.
pub fn hsalsa20(input: &[u8; BLOCK_SIZE]) -> [u8; HSALSA20_OUTPUT_SIZE] {
    let state = words_from_block(input);
    let permuted = permute(&state);

    const OUTPUT_WORDS: [usize; 8] = [0, 5, 10, 15, 6, 7, 8, 9];
    let mut out = [0u8; HSALSA20_OUTPUT_SIZE];
    for (i, &word_idx) in OUTPUT_WORDS.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&permuted[word_idx].to_le_bytes());
    }

    out
}

/// Build one 64-byte Salsa20 keystream block for (key, nonce, block index).
///
/// Lays out the input block with the default constants, `key`, `nonce`, and
/// `index` (little-endian in the low 16 bits of the counter words, with the
/// remaining counter bytes zeroed), then runs [`salsa20_block`] over it.
///
/// `index` is intentionally 16 bits wide, bounding supported message length
/// to `(2^16 - 1) * 64 + 32` bytes — see the crate-level docs of
/// `xsalsa20poly1305` for the rationale.
pub fn keystream_block(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], index: u16) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    load_constants(&mut block);
    load_key(&mut block, key);
    load_nonce(&mut block, nonce);
    block[32..34].copy_from_slice(&index.to_le_bytes());
    // bytes 34..40 are the high bytes of the block counter; always zero
    // since `index` never exceeds 16 bits.

    let out = salsa20_block(&block);

    #[cfg(feature = "zeroize")]
    {
        let mut block = block;
        block.zeroize();
    }

    out
}

/// Derive an XSalsa20 session subkey from a key and the first 16 bytes of an
/// extended nonce.
///
/// The C reference implementation this is based on allows `subkey_out` and
/// `key` to alias the same buffer; here that's moot, since a `&mut` and a
/// `&` to the same array can't coexist under Rust's borrow rules, so the
/// aliasing case the original had to special-case is structurally
/// unreachable through this signature.
pub fn xsalsa20_subkey(subkey_out: &mut [u8; KEY_SIZE], key: &[u8; KEY_SIZE], nonce16: &[u8; HNONCE_SIZE]) {
    let mut block = [0u8; BLOCK_SIZE];
    load_constants(&mut block);
    load_key(&mut block, key);
    load_hnonce(&mut block, nonce16);

    let subkey = hsalsa20(&block);
    subkey_out.copy_from_slice(&subkey);

    #[cfg(feature = "zeroize")]
    {
        let mut block = block;
        block.zeroize();
    }
}
