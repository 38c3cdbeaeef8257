//! NRPN live-update messages.
//!
//! Sequential synths take parameter changes as non-registered parameter
//! numbers with 14-bit data, most significant byte first:
//!
//! ```text
//! Bn 63 <param MSB>   Bn 62 <param LSB>   Bn 06 <value MSB>   Bn 26 <value LSB>
//! ```

use serde::Serialize;

const NRPN_MSB: u8 = 99;
const NRPN_LSB: u8 = 98;
const DATA_ENTRY_MSB: u8 = 6;
const DATA_ENTRY_LSB: u8 = 38;

/// Largest value that fits into 14 bits.
pub const MAX_14BIT: u16 = 0x3FFF;

/// A MIDI channel, stored zero-based (0-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct MidiChannel(u8);

impl MidiChannel {
    pub fn from_zero_based(channel: u8) -> Option<Self> {
        (channel < 16).then_some(Self(channel))
    }

    pub fn from_one_based(channel: u8) -> Option<Self> {
        channel.checked_sub(1).and_then(Self::from_zero_based)
    }

    pub fn zero_based(self) -> u8 {
        self.0
    }

    pub fn one_based(self) -> u8 {
        self.0 + 1
    }
}

/// Control change message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    pub channel: MidiChannel,
    pub controller: u8,
    pub value: u8,
}

impl ControlChange {
    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        [0xB0 | self.channel.zero_based(), self.controller & 0x7F, self.value & 0x7F]
    }
}

/// A parameter number and its 14-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Nrpn {
    pub parameter: u16,
    pub value: u16,
}

impl Nrpn {
    pub fn new(parameter: u16, value: u16) -> Self {
        Self {
            parameter: parameter & MAX_14BIT,
            value: value & MAX_14BIT,
        }
    }

    /// The four control changes carrying this NRPN, MSB before LSB.
    pub fn to_control_changes(&self, channel: MidiChannel) -> [ControlChange; 4] {
        let cc = |controller, value: u16| ControlChange {
            channel,
            controller,
            value: value as u8,
        };
        [
            cc(NRPN_MSB, self.parameter >> 7),
            cc(NRPN_LSB, self.parameter & 0x7F),
            cc(DATA_ENTRY_MSB, self.value >> 7),
            cc(DATA_ENTRY_LSB, self.value & 0x7F),
        ]
    }

    /// Raw MIDI bytes of the four control changes.
    pub fn to_bytes(&self, channel: MidiChannel) -> Vec<u8> {
        self.to_control_changes(channel)
            .iter()
            .flat_map(|cc| cc.to_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bounds() {
        assert_eq!(MidiChannel::from_one_based(1), MidiChannel::from_zero_based(0));
        assert_eq!(MidiChannel::from_one_based(0), None);
        assert_eq!(MidiChannel::from_one_based(17), None);
        assert_eq!(MidiChannel::from_zero_based(15).unwrap().one_based(), 16);
    }

    #[test]
    fn test_nrpn_bytes_msb_first() {
        let channel = MidiChannel::from_one_based(3).unwrap();
        // 4190 = 32 * 128 + 94
        let bytes = Nrpn::new(4190, 1).to_bytes(channel);
        assert_eq!(
            bytes,
            vec![0xB2, 99, 32, 0xB2, 98, 94, 0xB2, 6, 0, 0xB2, 38, 1]
        );
    }

    #[test]
    fn test_nrpn_large_value() {
        let ccs = Nrpn::new(4097, 300).to_control_changes(MidiChannel::default());
        assert_eq!(ccs[2].value, 2);
        assert_eq!(ccs[3].value, 44);
    }
}
