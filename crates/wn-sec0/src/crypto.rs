// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Frame cryptography primitives
//!
//! Scheme 0 builds everything from raw AES-128 block encryption: the
//! encryption keystream is AES-OFB, frame authentication is an AES
//! CBC-MAC, and the two working keys are derived from the network key by
//! encrypting fixed filler blocks.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use zeroize::{Zeroize, ZeroizeOnDrop};

use wn_common::constants::AES_BLOCK_SIZE;
use wn_common::types::NetworkKey;

/// Filler block encrypted to produce the authentication key
const AUTH_KEY_FILL: u8 = 0x55;

/// Filler block encrypted to produce the encryption key
const ENC_KEY_FILL: u8 = 0xAA;

/// AES-128 ECB encryption of a single block, in place
pub(crate) fn encrypt_block(key: &[u8; AES_BLOCK_SIZE], block: &mut [u8; AES_BLOCK_SIZE]) {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    cipher.encrypt_block(GenericArray::from_mut_slice(block));
}

/// Working keys derived from the network key
///
/// Zeroized on drop; replacing the network key replaces these wholesale.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct FrameKeys {
    auth: [u8; AES_BLOCK_SIZE],
    enc: [u8; AES_BLOCK_SIZE],
}

impl FrameKeys {
    /// All-zero keys, used while no network key is loaded
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            auth: [0; AES_BLOCK_SIZE],
            enc: [0; AES_BLOCK_SIZE],
        }
    }

    /// Derive the authentication and encryption keys from a network key
    #[must_use]
    pub fn derive(netkey: &NetworkKey) -> Self {
        let mut auth = [AUTH_KEY_FILL; AES_BLOCK_SIZE];
        let mut enc = [ENC_KEY_FILL; AES_BLOCK_SIZE];
        encrypt_block(netkey.as_bytes(), &mut auth);
        encrypt_block(netkey.as_bytes(), &mut enc);
        Self { auth, enc }
    }

    /// Frame authentication key
    #[must_use]
    pub fn auth(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.auth
    }

    /// Frame encryption key
    #[must_use]
    pub fn enc(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.enc
    }
}

/// Apply the AES-OFB keystream to `data` in place
///
/// OFB is its own inverse, so the same call encrypts and decrypts.
pub fn ofb_apply(key: &[u8; AES_BLOCK_SIZE], iv: &[u8; AES_BLOCK_SIZE], data: &mut [u8]) {
    let mut feedback = *iv;
    for (i, byte) in data.iter_mut().enumerate() {
        if i % AES_BLOCK_SIZE == 0 {
            encrypt_block(key, &mut feedback);
        }
        *byte ^= feedback[i % AES_BLOCK_SIZE];
    }
}

/// AES CBC-MAC over `data`, chained from an encrypted IV
///
/// A trailing partial block gets one extra encryption pass, matching the
/// wire format. Callers truncate the result to the frame's tag size.
#[must_use]
pub fn cbc_mac(
    key: &[u8; AES_BLOCK_SIZE],
    iv: &[u8; AES_BLOCK_SIZE],
    data: &[u8],
) -> [u8; AES_BLOCK_SIZE] {
    let mut mac = *iv;
    encrypt_block(key, &mut mac);

    for (i, byte) in data.iter().enumerate() {
        mac[i % AES_BLOCK_SIZE] ^= byte;
        if i % AES_BLOCK_SIZE == AES_BLOCK_SIZE - 1 {
            encrypt_block(key, &mut mac);
        }
    }
    if data.len() % AES_BLOCK_SIZE != 0 {
        encrypt_block(key, &mut mac);
    }
    mac
}

/// Constant-time equality for authentication tags
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use wn_common::types::NodeId;

    // FIPS-197 appendix C.1
    #[test]
    fn aes128_known_block() {
        let key = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
            0x0E, 0x0F,
        ];
        let mut block = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ];
        encrypt_block(&key, &mut block);
        assert_eq!(
            block,
            [
                0x69, 0xC4, 0xE0, 0xD8, 0x6A, 0x7B, 0x04, 0x30, 0xD8, 0xCD, 0xB7, 0x80, 0x70,
                0xB4, 0xC5, 0x5A,
            ]
        );
    }

    #[test]
    fn ofb_is_an_involution() {
        let key = [0x42; 16];
        let iv = [0x17; 16];
        let original: [u8; 37] = core::array::from_fn(|i| i as u8);
        let mut data = original;
        ofb_apply(&key, &iv, &mut data);
        assert_ne!(data, original);
        ofb_apply(&key, &iv, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn cbc_mac_distinguishes_partial_blocks() {
        let key = [0x42; 16];
        let iv = [0; 16];
        // A full block and its 15-byte prefix differ in the final block
        // input, so the tags differ
        let full = cbc_mac(&key, &iv, &[1u8; 16]);
        let partial = cbc_mac(&key, &iv, &[1u8; 15]);
        assert_ne!(full, partial);
    }

    #[test]
    fn zero_padding_collisions_are_broken_by_the_length_byte() {
        let key = [0x42; 16];
        let iv = [0; 16];
        // Zero padding alone cannot tell trailing zeros from a shorter
        // message; the authenticated data's explicit ciphertext length
        // byte is what disambiguates them
        assert_eq!(
            cbc_mac(&key, &iv, &[0u8; 16]),
            cbc_mac(&key, &iv, &[0u8; 15])
        );

        let short: heapless::Vec<u8, 32> =
            crate::frame::auth_data(0x81, NodeId::new(1), NodeId::new(2), &[0u8; 15]).unwrap();
        let long: heapless::Vec<u8, 32> =
            crate::frame::auth_data(0x81, NodeId::new(1), NodeId::new(2), &[0u8; 16]).unwrap();
        assert_ne!(cbc_mac(&key, &iv, &short), cbc_mac(&key, &iv, &long));
    }

    #[test]
    fn derived_keys_differ() {
        let netkey = NetworkKey::new([0xE7; 16]);
        let keys = FrameKeys::derive(&netkey);
        assert_ne!(keys.auth(), keys.enc());
        assert_ne!(keys.auth(), netkey.as_bytes());
        assert_ne!(keys.enc(), netkey.as_bytes());
    }

    #[test]
    fn tag_comparison() {
        assert!(ct_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!ct_eq(&[1, 2, 3], &[1, 2, 4]));
        assert!(!ct_eq(&[1, 2, 3], &[1, 2]));
    }
}
