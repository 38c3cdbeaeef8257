//! MIDI Tuning Standard bulk dumps, used by the Rev2 for alternate tunings.

use crate::error::{Error, Result};
use crate::message::{frame, sysex_body};

const UNIVERSAL_NON_REALTIME: u8 = 0x7E;
const MIDI_TUNING_STANDARD: u8 = 0x08;
const BULK_DUMP_REQUEST: u8 = 0x00;
const BULK_DUMP_REPLY: u8 = 0x01;

const NAME_OFFSET: usize = 5;
const NAME_LENGTH: usize = 16;
const DATA_OFFSET: usize = NAME_OFFSET + NAME_LENGTH;
const NOTE_COUNT: usize = 128;

/// Body length of a bulk dump without `F0`/`F7`: header, program, name,
/// three bytes per note and the checksum.
pub const TUNING_DUMP_LENGTH: usize = DATA_OFFSET + NOTE_COUNT * 3 + 1;

/// Number of alternate tunings the Rev2 offers.
pub const REV2_TUNING_COUNT: usize = 17;

/// Zero-based tuning program the Rev2 receives user tunings into (slot 16 on the panel).
pub const REV2_USER_TUNING_SLOT: u8 = 15;

/// Structural check for a bulk tuning dump.
pub fn is_tuning_dump(raw: &[u8]) -> bool {
    let body = sysex_body(raw);
    body.len() == TUNING_DUMP_LENGTH
        && body[0] == UNIVERSAL_NON_REALTIME
        && body[2] == MIDI_TUNING_STANDARD
        && body[3] == BULK_DUMP_REPLY
}

/// Build a bulk dump request for one tuning program.
pub fn tuning_dump_request(device_id: u8, program: u8) -> Vec<u8> {
    frame(&[
        UNIVERSAL_NON_REALTIME,
        device_id & 0x7F,
        MIDI_TUNING_STANDARD,
        BULK_DUMP_REQUEST,
        program & 0x7F,
    ])
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b) & 0x7F
}

/// Retuning of a single MIDI note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningEntry {
    /// Nearest equal-tempered semitone at or below the target pitch.
    pub semitone: u8,
    /// Fraction of a semitone above `semitone`, in units of 1/16384.
    pub fraction: u16,
}

impl TuningEntry {
    /// Pitch in semitones, or `None` for the "no change" marker.
    pub fn semitones(&self) -> Option<f64> {
        if self.semitone == 0x7F && self.fraction == 0x3FFF {
            None
        } else {
            Some(self.semitone as f64 + self.fraction as f64 / 16384.0)
        }
    }
}

/// A parsed bulk tuning dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningDump {
    pub device_id: u8,
    pub program: u8,
    pub name: String,
    pub entries: Vec<TuningEntry>,
}

impl TuningDump {
    /// Parse a framed or unframed bulk tuning dump, verifying its checksum.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let body = sysex_body(raw);
        if !is_tuning_dump(body) {
            return Err(Error::MalformedFrame(format!(
                "not a bulk tuning dump ({} bytes)",
                body.len()
            )));
        }

        let expected = checksum(&body[..TUNING_DUMP_LENGTH - 1]);
        let actual = body[TUNING_DUMP_LENGTH - 1];
        if expected != actual {
            return Err(Error::MalformedFrame(format!(
                "tuning dump checksum 0x{:02X}, computed 0x{:02X}",
                actual, expected
            )));
        }

        let name = String::from_utf8_lossy(&body[NAME_OFFSET..DATA_OFFSET])
            .trim_end()
            .to_string();
        let entries = body[DATA_OFFSET..DATA_OFFSET + NOTE_COUNT * 3]
            .chunks(3)
            .map(|e| TuningEntry {
                semitone: e[0],
                fraction: ((e[1] as u16) << 7) | e[2] as u16,
            })
            .collect();

        Ok(Self {
            device_id: body[1],
            program: body[4],
            name,
            entries,
        })
    }

    /// Encode the tuning into a framed bulk dump for the given program slot.
    pub fn to_sysex(&self, program: u8) -> Vec<u8> {
        let mut body = Vec::with_capacity(TUNING_DUMP_LENGTH);
        body.extend_from_slice(&[
            UNIVERSAL_NON_REALTIME,
            self.device_id & 0x7F,
            MIDI_TUNING_STANDARD,
            BULK_DUMP_REPLY,
            program & 0x7F,
        ]);

        let mut name = [b' '; NAME_LENGTH];
        for (slot, byte) in name.iter_mut().zip(self.name.bytes().filter(|b| b.is_ascii())) {
            *slot = byte;
        }
        body.extend_from_slice(&name);

        for entry in self.entries.iter().take(NOTE_COUNT) {
            body.push(entry.semitone & 0x7F);
            body.push(((entry.fraction >> 7) & 0x7F) as u8);
            body.push((entry.fraction & 0x7F) as u8);
        }
        // Unlisted notes keep their pitch
        for _ in self.entries.len()..NOTE_COUNT {
            body.extend_from_slice(&[0x7F, 0x7F, 0x7F]);
        }

        body.push(checksum(&body));
        frame(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equal_temperament() -> TuningDump {
        TuningDump {
            device_id: 0x01,
            program: 3,
            name: "Equal".to_string(),
            entries: (0..128).map(|n| TuningEntry { semitone: n as u8, fraction: 0 }).collect(),
        }
    }

    #[test]
    fn test_dump_is_recognised() {
        let sysex = equal_temperament().to_sysex(3);
        assert_eq!(sysex.len(), TUNING_DUMP_LENGTH + 2);
        assert!(is_tuning_dump(&sysex));
    }

    #[test]
    fn test_retarget_keeps_content() {
        let sysex = equal_temperament().to_sysex(REV2_USER_TUNING_SLOT);
        let parsed = TuningDump::parse(&sysex).unwrap();
        assert_eq!(parsed.program, REV2_USER_TUNING_SLOT);
        assert_eq!(parsed.name, "Equal");
        assert_eq!(parsed.entries[69].semitones(), Some(69.0));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut sysex = equal_temperament().to_sysex(0);
        let idx = sysex.len() - 2;
        sysex[idx] ^= 0x01;
        assert!(matches!(TuningDump::parse(&sysex), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn test_no_change_marker() {
        let entry = TuningEntry { semitone: 0x7F, fraction: 0x3FFF };
        assert_eq!(entry.semitones(), None);
    }

    #[test]
    fn test_request_message() {
        assert_eq!(tuning_dump_request(0x01, 4), vec![0xF0, 0x7E, 0x01, 0x08, 0x00, 0x04, 0xF7]);
    }
}
