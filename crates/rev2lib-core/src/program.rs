//! Decoded Rev2 programs.
//!
//! A program is 2046 bytes of parameter data, split into two 1024-byte
//! layers (A and B). The adapter always works on a 2048-byte buffer so that
//! layer B addresses line up with layer A plus [`LAYER_B_OFFSET`]; the two
//! trailing bytes are never transmitted.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::fingerprint::{fingerprint, IdentityKey, REV2_BLANK_ZONES};
use crate::message::{
    classify, frame, sysex_body, MessageKind, DSI_MANUFACTURER_ID, EDIT_BUFFER_DATA, PROGRAM_DATA,
    REV2_MODEL_ID,
};
use crate::transcoder::{decode, encode, PROGRAM_LENGTH, WORKING_LENGTH};

/// Byte offset of layer B inside a program buffer.
pub const LAYER_B_OFFSET: usize = WORKING_LENGTH / 2;

/// Offset and size of the layer name inside each layer.
pub const LAYER_NAME_OFFSET: usize = 235;
pub const LAYER_NAME_LENGTH: usize = 20;

pub const NUMBER_OF_BANKS: usize = 8;
pub const PROGRAMS_PER_BANK: usize = 128;

/// One of the two sound layers of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Layer {
    A,
    B,
}

impl Layer {
    /// Start of this layer inside a program buffer.
    pub fn base(self) -> usize {
        match self {
            Layer::A => 0,
            Layer::B => LAYER_B_OFFSET,
        }
    }

    /// Zero-based layer number as used by the layer select NRPN.
    pub fn index(self) -> u16 {
        match self {
            Layer::A => 0,
            Layer::B => 1,
        }
    }
}

/// A decoded program in its 2048-byte working form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramBuffer {
    data: Vec<u8>,
}

impl ProgramBuffer {
    /// A program of all zero bytes.
    pub fn zeroed() -> Self {
        Self {
            data: vec![0; WORKING_LENGTH],
        }
    }

    /// Build a buffer from 2046 functional or 2048 working bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            PROGRAM_LENGTH | WORKING_LENGTH => {
                let mut data = bytes.to_vec();
                data.resize(WORKING_LENGTH, 0);
                Ok(Self { data })
            }
            actual => Err(Error::InvalidBufferShape {
                expected: WORKING_LENGTH,
                actual,
            }),
        }
    }

    /// Decode the packed payload of an edit buffer or program dump.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            data: decode(payload, WORKING_LENGTH)?,
        })
    }

    /// Pack the functional part of the buffer for transmission.
    pub fn to_payload(&self) -> Vec<u8> {
        encode(&self.data, PROGRAM_LENGTH)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Name stored in the given layer, trailing spaces removed.
    pub fn layer_name(&self, layer: Layer) -> String {
        let start = layer.base() + LAYER_NAME_OFFSET;
        self.data[start..start + LAYER_NAME_LENGTH]
            .iter()
            .map(|&b| if b.is_ascii() && !b.is_ascii_control() { b as char } else { ' ' })
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// Store a name in the given layer; ASCII only, space padded, cut at 20 characters.
    pub fn set_layer_name(&mut self, layer: Layer, name: &str) {
        let start = layer.base() + LAYER_NAME_OFFSET;
        let mut bytes = name.bytes().filter(|b| b.is_ascii() && !b.is_ascii_control());
        for slot in &mut self.data[start..start + LAYER_NAME_LENGTH] {
            *slot = bytes.next().unwrap_or(b' ');
        }
    }

    /// Content identity ignoring names and unused bytes.
    pub fn identity(&self) -> IdentityKey {
        fingerprint(&self.data, REV2_BLANK_ZONES)
    }
}

/// Storage place of a program: zero-based bank and program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProgramNumber {
    bank: u8,
    program: u8,
}

impl ProgramNumber {
    pub fn new(bank: u8, program: u8) -> Self {
        Self {
            bank: bank % NUMBER_OF_BANKS as u8,
            program: program & 0x7F,
        }
    }

    /// Storage place from the address bytes of a program dump.
    pub fn try_new(bank: u8, program: u8) -> Result<Self> {
        if bank as usize >= NUMBER_OF_BANKS || program as usize >= PROGRAMS_PER_BANK {
            return Err(Error::MalformedFrame(format!(
                "program address bank {} program {} out of range",
                bank, program
            )));
        }
        Ok(Self { bank, program })
    }

    /// Program number counted across all banks.
    pub fn from_zero_based(number: usize) -> Self {
        let number = number % (NUMBER_OF_BANKS * PROGRAMS_PER_BANK);
        Self::new((number / PROGRAMS_PER_BANK) as u8, (number % PROGRAMS_PER_BANK) as u8)
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    pub fn to_zero_based(&self) -> usize {
        self.bank as usize * PROGRAMS_PER_BANK + self.program as usize
    }
}

impl std::fmt::Display for ProgramNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} P{}", friendly_bank_name(self.bank as usize), self.program)
    }
}

/// Front panel name of a bank: U1-U4 for the user banks, F1-F4 for the factory banks.
pub fn friendly_bank_name(bank: usize) -> String {
    let section = if bank / 4 == 0 { "U" } else { "F" };
    format!("{}{}", section, bank % 4 + 1)
}

/// A program together with the place it was loaded from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub buffer: ProgramBuffer,
    pub number: Option<ProgramNumber>,
}

impl Program {
    pub fn new(buffer: ProgramBuffer) -> Self {
        Self { buffer, number: None }
    }

    /// Decode an edit buffer dump or a program dump.
    pub fn from_sysex(raw: &[u8]) -> Result<Self> {
        let kind = classify(raw);
        let body = sysex_body(raw);
        let (offset, number) = match kind {
            MessageKind::EditBufferDump => (crate::message::EDIT_BUFFER_PAYLOAD_OFFSET, None),
            MessageKind::ProgramDump { bank, program } => (
                crate::message::PROGRAM_DUMP_PAYLOAD_OFFSET,
                Some(ProgramNumber::try_new(bank, program)?),
            ),
            other => {
                return Err(Error::MalformedFrame(format!("expected a program, got {}", other)));
            }
        };

        let buffer = ProgramBuffer::from_payload(&body[offset..])?;
        log::debug!("Decoded {} '{}'", kind, buffer.layer_name(Layer::A));
        Ok(Self { buffer, number })
    }

    /// Name of layer A, which is what the synth shows as program name.
    pub fn name(&self) -> String {
        self.buffer.layer_name(Layer::A)
    }

    /// Encode as an edit buffer dump.
    pub fn to_edit_buffer_sysex(&self) -> Vec<u8> {
        edit_buffer_sysex(&self.buffer)
    }

    /// Encode as a program dump addressed to `number`.
    pub fn to_program_dump_sysex(&self, number: ProgramNumber) -> Vec<u8> {
        let mut body = vec![
            DSI_MANUFACTURER_ID,
            REV2_MODEL_ID,
            PROGRAM_DATA,
            number.bank(),
            number.program(),
        ];
        body.extend(self.buffer.to_payload());
        frame(&body)
    }

    pub fn identity(&self) -> IdentityKey {
        self.buffer.identity()
    }
}

/// Encode a program buffer as an edit buffer dump.
pub fn edit_buffer_sysex(buffer: &ProgramBuffer) -> Vec<u8> {
    let mut body = vec![DSI_MANUFACTURER_ID, REV2_MODEL_ID, EDIT_BUFFER_DATA];
    body.extend(buffer.to_payload());
    frame(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::ENCODED_PROGRAM_LENGTH;

    fn named_program(name: &str) -> ProgramBuffer {
        let mut buffer = ProgramBuffer::zeroed();
        for (i, b) in buffer.as_mut_bytes().iter_mut().enumerate().take(PROGRAM_LENGTH) {
            *b = (i % 200) as u8;
        }
        buffer.set_layer_name(Layer::A, name);
        buffer.set_layer_name(Layer::B, "Layer B");
        buffer
    }

    #[test]
    fn test_buffer_shapes() {
        assert_eq!(ProgramBuffer::from_bytes(&[0; 2046]).unwrap().as_bytes().len(), 2048);
        assert!(ProgramBuffer::from_bytes(&[0; 2048]).is_ok());
        assert_eq!(
            ProgramBuffer::from_bytes(&[0; 100]).unwrap_err(),
            Error::InvalidBufferShape { expected: 2048, actual: 100 }
        );
    }

    #[test]
    fn test_layer_names() {
        let mut buffer = named_program("Warm Pad");
        assert_eq!(buffer.layer_name(Layer::A), "Warm Pad");
        assert_eq!(buffer.layer_name(Layer::B), "Layer B");
        buffer.set_layer_name(Layer::A, "A name that is far too long");
        assert_eq!(buffer.layer_name(Layer::A), "A name that is far t");
    }

    #[test]
    fn test_edit_buffer_round_trip() {
        let program = Program::new(named_program("Bass"));
        let sysex = program.to_edit_buffer_sysex();
        assert_eq!(sysex.len(), 1 + 3 + ENCODED_PROGRAM_LENGTH + 1);
        assert_eq!(&sysex[..4], &[0xF0, 0x01, 0x2F, 0x03]);

        let decoded = Program::from_sysex(&sysex).unwrap();
        assert_eq!(decoded.buffer, program.buffer);
        assert_eq!(decoded.number, None);
        assert_eq!(decoded.name(), "Bass");
    }

    #[test]
    fn test_program_dump_carries_address() {
        let program = Program::new(named_program("Lead"));
        let number = ProgramNumber::from_zero_based(5 * 128 + 17);
        let sysex = program.to_program_dump_sysex(number);
        assert_eq!(&sysex[..6], &[0xF0, 0x01, 0x2F, 0x02, 5, 17]);

        let decoded = Program::from_sysex(&sysex).unwrap();
        assert_eq!(decoded.number, Some(number));
        assert_eq!(decoded.number.unwrap().to_zero_based(), 5 * 128 + 17);
    }

    #[test]
    fn test_program_dump_with_bad_bank_is_rejected() {
        let program = Program::new(named_program("Lead"));
        let mut sysex = program.to_program_dump_sysex(ProgramNumber::new(1, 3));
        sysex[4] = 9;
        assert_eq!(classify(&sysex), MessageKind::ProgramDump { bank: 9, program: 3 });
        assert!(matches!(Program::from_sysex(&sysex), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn test_checked_program_number() {
        assert_eq!(ProgramNumber::try_new(7, 127).unwrap(), ProgramNumber::new(7, 127));
        assert!(ProgramNumber::try_new(8, 0).is_err());
        assert!(ProgramNumber::try_new(0, 128).is_err());
    }

    #[test]
    fn test_from_sysex_rejects_other_kinds() {
        let err = Program::from_sysex(&[0xF0, 0x01, 0x2F, 0x0F, 0x00, 0xF7]).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
    }

    #[test]
    fn test_friendly_bank_names() {
        let names: Vec<String> = (0..NUMBER_OF_BANKS).map(friendly_bank_name).collect();
        assert_eq!(names, vec!["U1", "U2", "U3", "U4", "F1", "F2", "F3", "F4"]);
        assert_eq!(ProgramNumber::new(4, 12).to_string(), "F1 P12");
    }
}
