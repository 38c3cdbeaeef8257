//! 7-bit packing used by Sequential program and edit buffer dumps.
//!
//! SysEx bodies may only carry bytes below `0x80`. The Rev2 therefore sends
//! its 8-bit program data in packets of up to seven bytes, each preceded by a
//! byte that collects the packet's stripped high bits:
//!
//! ```text
//! input:   A B C D E F G   (8 bit each)
//! output:  0 g f e d c b a   A' B' C' D' E' F' G'
//!          \___ bit 7 of each input byte ___/  (each with bit 7 cleared)
//! ```
//!
//! A trailing packet with fewer than seven bytes is emitted as one header
//! byte plus the bytes it has, which is how 2046 program bytes become 2339
//! bytes on the wire.

use crate::error::{Error, Result};

/// Number of functional program bytes the Rev2 transmits.
pub const PROGRAM_LENGTH: usize = 2046;

/// Size of the working program buffer, including two bytes of trailing pad.
pub const WORKING_LENGTH: usize = 2048;

/// Encoded size of a [`PROGRAM_LENGTH`]-byte program.
pub const ENCODED_PROGRAM_LENGTH: usize = 2339;

/// Bytes the decoder may zero-fill when the payload stops short of the
/// requested length.
pub const TRAILING_PAD: usize = WORKING_LENGTH - PROGRAM_LENGTH;

const PACKET_SIZE: usize = 7;

/// Number of bytes `encode` produces for `unescaped_length` input bytes.
pub fn encoded_length(unescaped_length: usize) -> usize {
    let full = unescaped_length / PACKET_SIZE;
    let rest = unescaped_length % PACKET_SIZE;
    full * (PACKET_SIZE + 1) + if rest > 0 { rest + 1 } else { 0 }
}

/// Number of bytes a payload of `payload_length` bytes decodes to.
pub fn decoded_length(payload_length: usize) -> usize {
    let full = payload_length / (PACKET_SIZE + 1);
    let rest = payload_length % (PACKET_SIZE + 1);
    full * PACKET_SIZE + rest.saturating_sub(1)
}

/// Pack the first `unescaped_length` bytes of `buffer` into a 7-bit safe stream.
///
/// Only bytes that exist in `buffer` are packed, so a length beyond the end
/// of the buffer encodes the whole buffer.
pub fn encode(buffer: &[u8], unescaped_length: usize) -> Vec<u8> {
    let data = &buffer[..unescaped_length.min(buffer.len())];
    let mut out = Vec::with_capacity(encoded_length(data.len()));

    for packet in data.chunks(PACKET_SIZE) {
        let high_bits = packet
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, byte)| acc | ((byte >> 7) << i));
        out.push(high_bits);
        out.extend(packet.iter().map(|byte| byte & 0x7F));
    }

    out
}

/// Unpack a 7-bit safe payload into exactly `expected_length` bytes.
///
/// Up to [`TRAILING_PAD`] missing bytes at the end are filled with zeros,
/// because the Rev2 never transmits the last two bytes of its working
/// buffer. Anything shorter than that is rejected, as is a payload byte
/// with bit 7 set. Decoded bytes beyond `expected_length` are dropped.
pub fn decode(payload: &[u8], expected_length: usize) -> Result<Vec<u8>> {
    if let Some(pos) = payload.iter().position(|b| b & 0x80 != 0) {
        return Err(Error::MalformedFrame(format!(
            "byte 0x{:02X} at payload offset {} is not 7-bit safe",
            payload[pos], pos
        )));
    }

    let available = decoded_length(payload.len());
    let minimum = expected_length.saturating_sub(TRAILING_PAD);
    if available < minimum {
        return Err(Error::MalformedFrame(format!(
            "payload of {} bytes decodes to {} bytes, need at least {}",
            payload.len(),
            available,
            minimum
        )));
    }

    let mut out = Vec::with_capacity(expected_length.max(available));
    for packet in payload.chunks(PACKET_SIZE + 1) {
        let high_bits = packet[0];
        for (i, byte) in packet[1..].iter().enumerate() {
            out.push(byte | (((high_bits >> i) & 0x01) << 7));
        }
    }

    if out.len() > expected_length {
        log::debug!(
            "Dropping {} decoded bytes beyond the expected {}",
            out.len() - expected_length,
            expected_length
        );
    }
    out.resize(expected_length, 0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program() -> Vec<u8> {
        (0..PROGRAM_LENGTH).map(|i| (i * 37 % 256) as u8).collect()
    }

    #[test]
    fn test_program_encodes_to_wire_size() {
        let encoded = encode(&sample_program(), PROGRAM_LENGTH);
        assert_eq!(encoded.len(), ENCODED_PROGRAM_LENGTH);
        assert_eq!(encoded_length(PROGRAM_LENGTH), ENCODED_PROGRAM_LENGTH);
        assert!(encoded.iter().all(|b| b & 0x80 == 0));
    }

    #[test]
    fn test_decode_pads_to_working_length() {
        let program = sample_program();
        let encoded = encode(&program, PROGRAM_LENGTH);
        let decoded = decode(&encoded, WORKING_LENGTH).unwrap();
        assert_eq!(decoded.len(), WORKING_LENGTH);
        assert_eq!(&decoded[..PROGRAM_LENGTH], &program[..]);
        assert_eq!(&decoded[PROGRAM_LENGTH..], &[0, 0]);
    }

    #[test]
    fn test_encode_ignores_trailing_pad() {
        let mut working = sample_program();
        working.extend([0xAA, 0xBB]);
        assert_eq!(encode(&working, PROGRAM_LENGTH), encode(&sample_program(), PROGRAM_LENGTH));
    }

    #[test]
    fn test_round_trip_across_lengths() {
        for len in [0, 1, 6, 7, 8, 13, 14, 15, 100, PROGRAM_LENGTH, WORKING_LENGTH] {
            let data: Vec<u8> = (0..len).map(|i| (255 - i % 256) as u8).collect();
            let encoded = encode(&data, len);
            assert_eq!(encoded.len(), encoded_length(len));
            assert_eq!(decoded_length(encoded.len()), len);
            assert_eq!(decode(&encoded, len).unwrap(), data, "length {}", len);
        }
    }

    #[test]
    fn test_high_bits_collected_in_header() {
        let encoded = encode(&[0x80, 0x01, 0xFF], 3);
        assert_eq!(encoded, vec![0b0000_0101, 0x00, 0x01, 0x7F]);
    }

    #[test]
    fn test_short_payload_rejected() {
        let encoded = encode(&sample_program(), 2000);
        let err = decode(&encoded, WORKING_LENGTH).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
    }

    #[test]
    fn test_high_bit_in_payload_rejected() {
        let err = decode(&[0x00, 0x90], 1).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
    }

    #[test]
    fn test_excess_payload_truncated() {
        let encoded = encode(&[1, 2, 3, 4, 5, 6, 7, 8, 9], 9);
        assert_eq!(decode(&encoded, 4).unwrap(), vec![1, 2, 3, 4]);
    }
}
