// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Security command class wire formats
//!
//! Encapsulated frame layout (lengths in bytes):
//!
//! ```text
//! +-------+---------+--------------+------------+----------+-----+
//! | class | command | sender nonce | ciphertext | nonce id | MAC |
//! |   1   |    1    |      8       |    1..27   |    1     |  8  |
//! +-------+---------+--------------+------------+----------+-----+
//! ```
//!
//! The ciphertext covers a properties byte (segmentation flags + sequence
//! counter) followed by the payload fragment. The nonce id is the first
//! byte of the receiver nonce the sender consumed.

use heapless::Vec;

use wn_common::constants::{MAC_SIZE, NONCE_SIZE};
use wn_common::errors::{Error, Result};
use wn_common::types::NodeId;

/// Security command class identifier
pub const COMMAND_CLASS_SECURITY: u8 = 0x98;

/// Request the supported security schemes
pub const CMD_SCHEME_GET: u8 = 0x04;
/// Report the supported security schemes
pub const CMD_SCHEME_REPORT: u8 = 0x05;
/// Deliver the network key during inclusion
pub const CMD_NETWORK_KEY_SET: u8 = 0x06;
/// Confirm receipt of the network key
pub const CMD_NETWORK_KEY_VERIFY: u8 = 0x07;
/// Inherit the security scheme from the including controller
pub const CMD_SCHEME_INHERIT: u8 = 0x08;
/// Request a fresh nonce from the peer
pub const CMD_NONCE_GET: u8 = 0x40;
/// Deliver a fresh nonce to the peer
pub const CMD_NONCE_REPORT: u8 = 0x80;
/// Encrypted message encapsulation
pub const CMD_MESSAGE_ENCAP: u8 = 0x81;
/// Encrypted message encapsulation, piggybacking a nonce request
pub const CMD_MESSAGE_ENCAP_NONCE_GET: u8 = 0xC1;

/// Properties bit: this fragment belongs to a segmented message
pub const PROPERTIES_SEQUENCED: u8 = 0x10;
/// Properties bit: this is the second (final) fragment
pub const PROPERTIES_SECOND_FRAME: u8 = 0x20;
/// Properties mask for the sequence counter
pub const PROPERTIES_SEQUENCE_MASK: u8 = 0x0F;

/// Encapsulation bytes added around each plaintext fragment
pub const ENCAP_OVERHEAD: usize = 2 + NONCE_SIZE + 1 + 1 + MAC_SIZE;

/// Largest frame this layer transmits
pub const MAX_TX_FRAME: usize = 46;

/// Largest plaintext fragment per encapsulated frame
pub const MAX_FRAGMENT_PLAINTEXT: usize = MAX_TX_FRAME - ENCAP_OVERHEAD;

/// Nonce get frame
#[must_use]
pub const fn nonce_get() -> [u8; 2] {
    [COMMAND_CLASS_SECURITY, CMD_NONCE_GET]
}

/// Network key verify frame
#[must_use]
pub const fn key_verify() -> [u8; 2] {
    [COMMAND_CLASS_SECURITY, CMD_NETWORK_KEY_VERIFY]
}

/// Nonce report frame carrying a fresh nonce
#[must_use]
pub fn nonce_report(nonce: &[u8; NONCE_SIZE]) -> [u8; 2 + NONCE_SIZE] {
    let mut frame = [0u8; 2 + NONCE_SIZE];
    frame[0] = COMMAND_CLASS_SECURITY;
    frame[1] = CMD_NONCE_REPORT;
    frame[2..].copy_from_slice(nonce);
    frame
}

/// Bounds-checked view over a received encapsulated frame
pub struct EncapFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> EncapFrame<'a> {
    /// Parse a frame, verifying the minimum length
    ///
    /// Returns `None` for frames too short to carry every field,
    /// including the minimum one-byte ciphertext.
    #[must_use]
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() <= ENCAP_OVERHEAD {
            return None;
        }
        Some(Self { bytes })
    }

    /// Command byte (plain or nonce-get encapsulation)
    #[must_use]
    pub fn command(&self) -> u8 {
        self.bytes[1]
    }

    /// The sender's nonce (first half of the IV)
    #[must_use]
    pub fn sender_nonce(&self) -> &'a [u8] {
        &self.bytes[2..2 + NONCE_SIZE]
    }

    /// Encrypted properties byte plus payload fragment
    #[must_use]
    pub fn ciphertext(&self) -> &'a [u8] {
        &self.bytes[2 + NONCE_SIZE..self.bytes.len() - MAC_SIZE - 1]
    }

    /// Identifier (first byte) of the receiver nonce the sender consumed
    #[must_use]
    pub fn receiver_nonce_id(&self) -> u8 {
        self.bytes[self.bytes.len() - MAC_SIZE - 1]
    }

    /// Authentication tag
    #[must_use]
    pub fn mac(&self) -> &'a [u8] {
        &self.bytes[self.bytes.len() - MAC_SIZE..]
    }
}

/// Assemble the data covered by the frame authentication tag
///
/// The MAC covers the command byte, both node identifiers, the ciphertext
/// length and the ciphertext itself (encrypt-then-MAC).
///
/// # Errors
/// Returns `Error::BufferTooSmall` if the ciphertext does not fit `N`.
pub fn auth_data<const N: usize>(
    command: u8,
    source: NodeId,
    destination: NodeId,
    ciphertext: &[u8],
) -> Result<Vec<u8, N>> {
    let mut out: Vec<u8, N> = Vec::new();
    let overflow = out.push(command).is_err()
        || out.push(source.as_u8()).is_err()
        || out.push(destination.as_u8()).is_err()
        || out.push(ciphertext.len() as u8).is_err()
        || out.extend_from_slice(ciphertext).is_err();
    if overflow {
        return Err(Error::BufferTooSmall);
    }
    Ok(out)
}

/// Assemble an encapsulated frame into `out`
///
/// # Errors
/// Returns `Error::BufferTooSmall` if the ciphertext exceeds the frame
/// budget.
pub fn write_encap(
    out: &mut Vec<u8, MAX_TX_FRAME>,
    command: u8,
    sender_nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    receiver_nonce_id: u8,
    mac: &[u8; MAC_SIZE],
) -> Result<()> {
    out.clear();
    let overflow = out.push(COMMAND_CLASS_SECURITY).is_err()
        || out.push(command).is_err()
        || out.extend_from_slice(sender_nonce).is_err()
        || out.extend_from_slice(ciphertext).is_err()
        || out.push(receiver_nonce_id).is_err()
        || out.extend_from_slice(mac).is_err();
    if overflow {
        out.clear();
        return Err(Error::BufferTooSmall);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured single-fragment frame from an interop trace
    const FRAME: [u8; 22] = [
        0x98, 0x81, 0x11, 0x48, 0x1C, 0x51, 0xA2, 0x17, 0x12, 0x32, 0x36, 0x3E, 0xD0, 0xE0, 0xC2,
        0x55, 0xB3, 0xF4, 0xC5, 0x8F, 0x7F, 0x20,
    ];

    #[test]
    fn parse_splits_fields() {
        let frame = EncapFrame::parse(&FRAME).unwrap();
        assert_eq!(frame.command(), CMD_MESSAGE_ENCAP);
        assert_eq!(
            frame.sender_nonce(),
            &[0x11, 0x48, 0x1C, 0x51, 0xA2, 0x17, 0x12, 0x32]
        );
        assert_eq!(frame.ciphertext(), &[0x36, 0x3E, 0xD0]);
        assert_eq!(frame.receiver_nonce_id(), 0xE0);
        assert_eq!(
            frame.mac(),
            &[0xC2, 0x55, 0xB3, 0xF4, 0xC5, 0x8F, 0x7F, 0x20]
        );
    }

    #[test]
    fn parse_rejects_short_frames() {
        assert!(EncapFrame::parse(&FRAME[..ENCAP_OVERHEAD - 1]).is_none());
        assert!(EncapFrame::parse(&[]).is_none());
    }

    #[test]
    fn write_encap_round_trips() {
        let mut out: Vec<u8, MAX_TX_FRAME> = Vec::new();
        let sender_nonce = [0x11, 0x48, 0x1C, 0x51, 0xA2, 0x17, 0x12, 0x32];
        let mac = [0xC2, 0x55, 0xB3, 0xF4, 0xC5, 0x8F, 0x7F, 0x20];
        write_encap(
            &mut out,
            CMD_MESSAGE_ENCAP,
            &sender_nonce,
            &[0x36, 0x3E, 0xD0],
            0xE0,
            &mac,
        )
        .unwrap();
        assert_eq!(out.as_slice(), &FRAME);
    }

    #[test]
    fn write_encap_enforces_frame_budget() {
        let mut out: Vec<u8, MAX_TX_FRAME> = Vec::new();
        let oversized = [0u8; MAX_FRAGMENT_PLAINTEXT + 2];
        let err = write_encap(
            &mut out,
            CMD_MESSAGE_ENCAP,
            &[0; NONCE_SIZE],
            &oversized,
            0,
            &[0; MAC_SIZE],
        )
        .unwrap_err();
        assert_eq!(err, Error::BufferTooSmall);
        assert!(out.is_empty());
    }

    #[test]
    fn auth_data_layout() {
        let auth: Vec<u8, 8> =
            auth_data(CMD_MESSAGE_ENCAP, NodeId::new(1), NodeId::new(78), &[0x36, 0x3E, 0xD0])
                .unwrap();
        assert_eq!(auth.as_slice(), &[0x81, 1, 78, 3, 0x36, 0x3E, 0xD0]);

        let overflow: super::Result<Vec<u8, 4>> =
            auth_data(CMD_MESSAGE_ENCAP, NodeId::new(1), NodeId::new(78), &[0x36]);
        assert_eq!(overflow.unwrap_err(), Error::BufferTooSmall);
    }

    #[test]
    fn small_frames() {
        assert_eq!(nonce_get(), [0x98, 0x40]);
        assert_eq!(key_verify(), [0x98, 0x07]);
        let report = nonce_report(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(report[..2], [0x98, 0x80]);
        assert_eq!(report[2..], [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
