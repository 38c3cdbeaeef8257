//! Byte-level transforms of the two Rev2 sequencers inside a program.
//!
//! Each layer holds a gated step sequencer (4 tracks of 16 steps) and a poly
//! sequencer (6 tracks of 64 note/velocity steps). Layer B uses the same
//! layout shifted by [`LAYER_B_OFFSET`].
//!
//! ```text
//! 111        gated sequencer destination of track 1
//! 130 131    tempo, clock divide
//! 139        sequencer mode (0 gated, 1 poly)
//! 140..204   gated tracks 1-4, 16 steps each
//! 231        A/B mode (1 stacked)
//! 256..1024  poly tracks 1-6: 64 notes followed by 64 velocities each
//! ```

use std::ops::Range;

use crate::error::{Error, Result};
use crate::message::{classify, sysex_body, MessageKind, EDIT_BUFFER_PAYLOAD_OFFSET};
use crate::program::{edit_buffer_sysex, Layer, Program, ProgramBuffer, LAYER_B_OFFSET};

pub const GATED_DESTINATION: usize = 111;
pub const TEMPO: usize = 130;
pub const CLOCK_DIVIDE: usize = 131;
pub const SEQUENCER_MODE: usize = 139;
pub const GATED_TRACKS: usize = 140;
pub const AB_MODE: usize = 231;
pub const POLY_NOTES: usize = 256;
pub const POLY_VELOCITIES: usize = 320;

pub const GATED_TRACK_COUNT: usize = 4;
pub const GATED_STEPS: usize = 16;
pub const POLY_TRACK_COUNT: usize = 6;
pub const POLY_STEPS: usize = 64;
const POLY_TRACK_STRIDE: usize = 2 * POLY_STEPS;

/// Note written into cleared poly sequencer steps.
pub const DEFAULT_NOTE: u8 = 0x3C;
/// Gated sequencer value for a step that plays nothing.
pub const GATED_REST: u8 = 127;
/// Largest value written into gated steps.
pub const GATED_MAX: i32 = 125;

const MODE_GATED: u8 = 0;
const DESTINATION_OSC_ALL_FREQ: u8 = 3;
const AB_MODE_STACKED: u8 = 1;

const POLY_REST_NOTE: u8 = 60;
const POLY_REST_VELOCITY: u8 = 128;

/// Named byte ranges of the sequencer data, relative to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerRegion {
    /// 64 note bytes of one poly track
    PolyNotes(usize),
    /// 64 velocity bytes of one poly track
    PolyVelocities(usize),
    /// All six poly tracks, notes and velocities
    PolySequence,
    /// 16 steps of one gated track
    GatedTrack(usize),
    /// All four gated tracks
    GatedTracks,
    SequencerMode,
    GatedDestination,
    Tempo,
    ClockDivide,
}

impl SequencerRegion {
    /// Absolute byte range of this region in the given layer.
    pub fn range(self, layer: Layer) -> Range<usize> {
        let local = match self {
            SequencerRegion::PolyNotes(track) => {
                let start = POLY_NOTES + track * POLY_TRACK_STRIDE;
                start..start + POLY_STEPS
            }
            SequencerRegion::PolyVelocities(track) => {
                let start = POLY_VELOCITIES + track * POLY_TRACK_STRIDE;
                start..start + POLY_STEPS
            }
            SequencerRegion::PolySequence => {
                POLY_NOTES..POLY_NOTES + POLY_TRACK_COUNT * POLY_TRACK_STRIDE
            }
            SequencerRegion::GatedTrack(track) => {
                let start = GATED_TRACKS + track * GATED_STEPS;
                start..start + GATED_STEPS
            }
            SequencerRegion::GatedTracks => {
                GATED_TRACKS..GATED_TRACKS + GATED_TRACK_COUNT * GATED_STEPS
            }
            SequencerRegion::SequencerMode => SEQUENCER_MODE..SEQUENCER_MODE + 1,
            SequencerRegion::GatedDestination => GATED_DESTINATION..GATED_DESTINATION + 1,
            SequencerRegion::Tempo => TEMPO..TEMPO + 1,
            SequencerRegion::ClockDivide => CLOCK_DIVIDE..CLOCK_DIVIDE + 1,
        };
        let base = layer.base();
        local.start + base..local.end + base
    }
}

/// Regions carried over by [`copy_sequencer_region`], per layer.
const TRANSPLANTED_REGIONS: [SequencerRegion; 6] = [
    SequencerRegion::PolySequence,
    SequencerRegion::GatedTracks,
    SequencerRegion::SequencerMode,
    SequencerRegion::GatedDestination,
    SequencerRegion::Tempo,
    SequencerRegion::ClockDivide,
];

/// Regions mirrored from layer A to B when a stacked program gets a gated sequence.
const STACKED_MIRROR_REGIONS: [SequencerRegion; 5] = [
    SequencerRegion::GatedTracks,
    SequencerRegion::SequencerMode,
    SequencerRegion::GatedDestination,
    SequencerRegion::Tempo,
    SequencerRegion::ClockDivide,
];

fn clamp_gated(value: i32) -> u8 {
    value.clamp(0, GATED_MAX) as u8
}

fn is_poly_rest(note: u8, velocity: u8) -> bool {
    note == POLY_REST_NOTE && velocity == POLY_REST_VELOCITY
}

fn is_poly_tie(note: u8) -> bool {
    note > 128
}

fn copy_region(target: &mut [u8], source: &[u8], range: Range<usize>) {
    target[range.clone()].copy_from_slice(&source[range]);
}

/// Turn the first 16 steps of poly track 1 (layer A) into a gated sequence.
///
/// Notes go into `target_gated_track`, halved velocities into the track
/// after it, so the target must leave room for that pair. The sequence is
/// moved down in whole octaves until its first note is at or below the
/// lowest note, which keeps every gated pitch non-negative and in key.
/// Stacked programs get the result mirrored into layer B.
pub fn poly_to_gated(buffer: &[u8], target_gated_track: usize) -> Result<ProgramBuffer> {
    if target_gated_track + 1 >= GATED_TRACK_COUNT {
        return Err(Error::InvalidTrack(target_gated_track));
    }
    let mut program = ProgramBuffer::from_bytes(buffer)?;
    let data = program.as_mut_bytes();

    let notes_range = SequencerRegion::PolyNotes(0).range(Layer::A);
    let velocities_range = SequencerRegion::PolyVelocities(0).range(Layer::A);
    let mut notes = [0u8; GATED_STEPS];
    let mut velocities = [0u8; GATED_STEPS];
    notes.copy_from_slice(&data[notes_range.start..notes_range.start + GATED_STEPS]);
    velocities.copy_from_slice(&data[velocities_range.start..velocities_range.start + GATED_STEPS]);

    let lowest = notes.iter().map(|&n| n as i32).fold(127, i32::min);
    let mut transposition = notes[0] as i32;
    while lowest < transposition {
        transposition -= 12;
    }
    log::debug!(
        "Converting poly track 1 to gated track {} (lowest note {}, base {})",
        target_gated_track + 1,
        lowest,
        transposition
    );

    let note_track = SequencerRegion::GatedTrack(target_gated_track).range(Layer::A);
    let velocity_track = SequencerRegion::GatedTrack(target_gated_track + 1).range(Layer::A);
    for step in 0..GATED_STEPS {
        let note = notes[step];
        let velocity = velocities[step];
        data[note_track.start + step] =
            if velocity > 0 && !is_poly_rest(note, velocity) && !is_poly_tie(note) {
                clamp_gated((note as i32 - transposition) * 2)
            } else {
                GATED_REST
            };
        data[velocity_track.start + step] = clamp_gated(velocity as i32 / 2);
    }

    data[SEQUENCER_MODE] = MODE_GATED;
    data[GATED_DESTINATION] = DESTINATION_OSC_ALL_FREQ;

    if data[AB_MODE] == AB_MODE_STACKED {
        for region in STACKED_MIRROR_REGIONS {
            let a = region.range(Layer::A);
            let start = a.start;
            data.copy_within(a, start + LAYER_B_OFFSET);
        }
    }

    Ok(program)
}

/// Transplant both layers' sequencer data, tempo and clock divide from
/// `source` into `target`, leaving the rest of `target` untouched.
pub fn copy_sequencer_region(target: &[u8], source: &[u8]) -> Result<ProgramBuffer> {
    let mut program = ProgramBuffer::from_bytes(target)?;
    let source = ProgramBuffer::from_bytes(source)?;

    for layer in [Layer::A, Layer::B] {
        for region in TRANSPLANTED_REGIONS {
            copy_region(program.as_mut_bytes(), source.as_bytes(), region.range(layer));
        }
    }
    Ok(program)
}

/// Reset all six poly tracks of the selected layers to the default note at velocity zero.
pub fn clear_poly_sequence(buffer: &[u8], layer_a: bool, layer_b: bool) -> Result<ProgramBuffer> {
    let mut program = ProgramBuffer::from_bytes(buffer)?;
    for (layer, selected) in [(Layer::A, layer_a), (Layer::B, layer_b)] {
        if !selected {
            continue;
        }
        let data = program.as_mut_bytes();
        for track in 0..POLY_TRACK_COUNT {
            data[SequencerRegion::PolyNotes(track).range(layer)].fill(DEFAULT_NOTE);
            data[SequencerRegion::PolyVelocities(track).range(layer)].fill(0);
        }
    }
    Ok(program)
}

/// Decode an edit buffer dump, transform the program and encode the result
/// as a new edit buffer dump.
pub fn transform_edit_buffer<F>(raw: &[u8], transform: F) -> Result<Vec<u8>>
where
    F: FnOnce(&[u8]) -> Result<ProgramBuffer>,
{
    let kind = classify(raw);
    if kind != MessageKind::EditBufferDump {
        return Err(Error::MalformedFrame(format!(
            "expected an edit buffer dump, got {}",
            kind
        )));
    }
    let program = ProgramBuffer::from_payload(&sysex_body(raw)[EDIT_BUFFER_PAYLOAD_OFFSET..])?;
    let transformed = transform(program.as_bytes())?;
    Ok(edit_buffer_sysex(&transformed))
}

/// [`poly_to_gated`] on an edit buffer dump.
pub fn patch_poly_sequence_to_gated_track(raw: &[u8], gated_track: usize) -> Result<Vec<u8>> {
    transform_edit_buffer(raw, |program| poly_to_gated(program, gated_track))
}

/// [`copy_sequencer_region`] on an edit buffer dump, taking the sequences
/// from `locked`, which may be an edit buffer or a program dump.
pub fn copy_sequencers_from_other(current: &[u8], locked: &[u8]) -> Result<Vec<u8>> {
    let locked = Program::from_sysex(locked)?;
    transform_edit_buffer(current, |program| {
        copy_sequencer_region(program, locked.buffer.as_bytes())
    })
}

/// [`clear_poly_sequence`] on an edit buffer dump.
pub fn clear_poly_sequencer(raw: &[u8], layer_a: bool, layer_b: bool) -> Result<Vec<u8>> {
    transform_edit_buffer(raw, |program| clear_poly_sequence(program, layer_a, layer_b))
}
