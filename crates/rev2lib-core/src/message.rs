//! SysEx framing and classification of incoming Rev2 messages.
//!
//! Every Rev2 message starts with the Sequential manufacturer id and the
//! Rev2 model id, followed by a single byte naming the message kind:
//!
//! ```text
//! F0 01 2F 03 <2339 packed bytes> F7            edit buffer dump
//! F0 01 2F 02 <bank> <program> <2339 bytes> F7  program dump
//! F0 01 2F 0F <global parameter bytes> F7       main parameter dump
//! ```
//!
//! Alternate tunings arrive as MIDI Tuning Standard bulk dumps, which use the
//! universal non-realtime header instead (see [`crate::tuning`]).
//!
//! All functions here accept messages with or without the `F0`/`F7` framing.

use serde::Serialize;

use crate::program::ProgramNumber;
use crate::tuning;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Manufacturer id of Sequential (formerly Dave Smith Instruments).
pub const DSI_MANUFACTURER_ID: u8 = 0x01;
/// Model id of the Prophet Rev2.
pub const REV2_MODEL_ID: u8 = 0x2F;

pub const PROGRAM_DATA: u8 = 0x02;
pub const EDIT_BUFFER_DATA: u8 = 0x03;
pub const REQUEST_PROGRAM: u8 = 0x05;
pub const REQUEST_EDIT_BUFFER: u8 = 0x06;
pub const REQUEST_MAIN_PARAMETERS: u8 = 0x0E;
pub const MAIN_PARAMETER_DATA: u8 = 0x0F;

/// Offset of the packed program inside an edit buffer dump body.
pub const EDIT_BUFFER_PAYLOAD_OFFSET: usize = 3;
/// Offset of the packed program inside a program dump body.
pub const PROGRAM_DUMP_PAYLOAD_OFFSET: usize = 5;
/// Offset of the (unpacked) global parameters inside a main parameter dump body.
pub const GLOBAL_SETTINGS_PAYLOAD_OFFSET: usize = 3;

/// What a raw SysEx message contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    /// The synth's current, unsaved program.
    EditBufferDump,
    /// A stored program with its zero-based bank and program address.
    ProgramDump { bank: u8, program: u8 },
    /// The global parameter block.
    GlobalSettingsDump,
    /// A MIDI Tuning Standard bulk dump.
    TuningDump,
    /// Anything else.
    Unknown,
}

impl MessageKind {
    /// Offset into the message body where the payload starts, if there is one.
    pub fn payload_offset(&self) -> Option<usize> {
        match self {
            MessageKind::EditBufferDump => Some(EDIT_BUFFER_PAYLOAD_OFFSET),
            MessageKind::ProgramDump { .. } => Some(PROGRAM_DUMP_PAYLOAD_OFFSET),
            MessageKind::GlobalSettingsDump => Some(GLOBAL_SETTINGS_PAYLOAD_OFFSET),
            MessageKind::TuningDump | MessageKind::Unknown => None,
        }
    }

    /// Whether the message carries packed program data.
    pub fn is_program(&self) -> bool {
        matches!(self, MessageKind::EditBufferDump | MessageKind::ProgramDump { .. })
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::EditBufferDump => write!(f, "edit buffer dump"),
            MessageKind::ProgramDump { bank, program } => {
                write!(f, "program dump (bank {}, program {})", bank, program)
            }
            MessageKind::GlobalSettingsDump => write!(f, "global settings dump"),
            MessageKind::TuningDump => write!(f, "tuning dump"),
            MessageKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Strip the `F0`/`F7` framing from a message if present.
pub fn sysex_body(raw: &[u8]) -> &[u8] {
    let body = raw.strip_prefix(&[SYSEX_START]).unwrap_or(raw);
    body.strip_suffix(&[SYSEX_END]).unwrap_or(body)
}

/// Wrap a message body in `F0`/`F7`.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(SYSEX_START);
    out.extend_from_slice(body);
    out.push(SYSEX_END);
    out
}

/// Split a byte stream such as the contents of a `.syx` file into its
/// individual framed messages.
///
/// Bytes between messages are skipped; an unterminated message at the end
/// of the stream is dropped.
pub fn split_sysex(stream: &[u8]) -> Vec<&[u8]> {
    let mut messages = Vec::new();
    let mut start = None;

    for (i, &byte) in stream.iter().enumerate() {
        match byte {
            SYSEX_START => {
                if let Some(open) = start {
                    log::warn!("SysEx at offset {} not terminated before offset {}", open, i);
                }
                start = Some(i);
            }
            SYSEX_END => {
                if let Some(open) = start.take() {
                    messages.push(&stream[open..=i]);
                }
            }
            _ => {}
        }
    }

    if let Some(open) = start {
        log::warn!("Dropping unterminated SysEx at offset {}", open);
    }
    messages
}

/// Whether the message carries the Sequential manufacturer id and Rev2 model id.
pub fn is_own_sysex(raw: &[u8]) -> bool {
    let body = sysex_body(raw);
    body.len() > 2 && body[0] == DSI_MANUFACTURER_ID && body[1] == REV2_MODEL_ID
}

/// Determine what kind of data a raw SysEx message carries.
///
/// Never fails: anything that is neither a recognised Rev2 message nor a
/// tuning dump is [`MessageKind::Unknown`].
pub fn classify(raw: &[u8]) -> MessageKind {
    let body = sysex_body(raw);

    if is_own_sysex(body) {
        return match body[2] {
            EDIT_BUFFER_DATA => MessageKind::EditBufferDump,
            PROGRAM_DATA if body.len() >= PROGRAM_DUMP_PAYLOAD_OFFSET => MessageKind::ProgramDump {
                bank: body[3],
                program: body[4],
            },
            MAIN_PARAMETER_DATA => MessageKind::GlobalSettingsDump,
            _ => MessageKind::Unknown,
        };
    }

    if tuning::is_tuning_dump(body) {
        return MessageKind::TuningDump;
    }

    MessageKind::Unknown
}

fn rev2_message(kind: u8, address: &[u8]) -> Vec<u8> {
    let mut body = vec![DSI_MANUFACTURER_ID, REV2_MODEL_ID, kind];
    body.extend_from_slice(address);
    frame(&body)
}

/// Ask the synth to send its edit buffer.
pub fn edit_buffer_request() -> Vec<u8> {
    rev2_message(REQUEST_EDIT_BUFFER, &[])
}

/// Ask the synth to send a stored program.
pub fn program_request(number: ProgramNumber) -> Vec<u8> {
    rev2_message(REQUEST_PROGRAM, &[number.bank(), number.program()])
}

/// Ask the synth to send its global parameters.
pub fn global_settings_request() -> Vec<u8> {
    rev2_message(REQUEST_MAIN_PARAMETERS, &[])
}
