//! rev2lib-core - SysEx protocol adapter for the Sequential Prophet Rev2
//!
//! Turns the raw SysEx the Rev2 sends into typed data and back:
//!
//! - 7-bit packing of program data ([`transcoder`])
//! - Classification and framing of incoming messages ([`message`])
//! - Decoded programs with names and storage addresses ([`program`])
//! - Content identity for duplicate detection ([`fingerprint`])
//! - Typed global settings with NRPN live updates ([`settings`], [`nrpn`])
//! - Poly to gated sequencer conversion and sequence transplanting ([`sequencer`])
//! - MIDI Tuning Standard dumps for alternate tunings ([`tuning`])
//!
//! # Usage as a Library
//!
//! ```no_run
//! use rev2lib_core::{sequencer, MessageKind, Rev2, Synth};
//!
//! # fn run(edit_buffer: &[u8]) -> rev2lib_core::Result<()> {
//! let rev2 = Rev2::default();
//! let program = rev2.patch_from_sysex(edit_buffer)?;
//! println!("Loaded '{}'", program.name());
//!
//! // Put the first poly track into gated track 1 and send it back
//! let converted = sequencer::patch_poly_sequence_to_gated_track(edit_buffer, 0)?;
//! assert_eq!(rev2.classify(&converted), MessageKind::EditBufferDump);
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod error;
pub mod fingerprint;
pub mod message;
pub mod nrpn;
pub mod program;
pub mod sequencer;
pub mod settings;
pub mod transcoder;
pub mod tuning;

// Re-export main types
pub use device::{DataKind, Rev2, Synth};
pub use error::{Error, Result};
pub use fingerprint::{fingerprint, BlankZone, IdentityKey, REV2_BLANK_ZONES};
pub use message::{classify, split_sysex, MessageKind};
pub use nrpn::{MidiChannel, Nrpn};
pub use program::{Layer, Program, ProgramBuffer, ProgramNumber};
pub use settings::{GlobalSettingDefinition, GlobalSettings, SettingEvent, SettingReport};
pub use tuning::TuningDump;
