//! Device model of the Prophet Rev2 as seen by a librarian.

use crossbeam_channel::Sender;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fingerprint;
use crate::message::{self, global_settings_request, program_request, MessageKind};
use crate::nrpn::{MidiChannel, Nrpn};
use crate::program::{self, edit_buffer_sysex, Layer, Program, ProgramBuffer, ProgramNumber};
use crate::settings::{GlobalSettings, SettingEvent};
use crate::tuning::{self, TuningDump, REV2_TUNING_COUNT, REV2_USER_TUNING_SLOT};

const NRPN_MIDI_CHANNEL: u16 = 4098;
const SETTING_MIDI_CHANNEL: &str = "MIDI Channel";
const NRPN_MIDI_CONTROL: u16 = 4103;
const NRPN_LOCAL_CONTROL: u16 = 4107;
const NRPN_LAYER_SELECT: u16 = 4190;

/// Device id tuning requests are addressed to.
const TUNING_DEVICE_ID: u8 = 0x01;

/// Kinds of data a librarian stores for a synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Patch,
    GlobalSettings,
    AlternateTuning,
}

impl DataKind {
    pub fn name(self) -> &'static str {
        match self {
            DataKind::Patch => "Patch",
            DataKind::GlobalSettings => "Global Settings",
            DataKind::AlternateTuning => "Alternate Tuning",
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What every supported synth exposes.
///
/// Optional features are capability queries returning `Option`; a caller
/// asks for the capability instead of inspecting the concrete type.
pub trait Synth {
    /// Display name of the device.
    fn name(&self) -> &str;

    fn number_of_banks(&self) -> usize;

    fn number_of_patches(&self) -> usize;

    fn friendly_bank_name(&self, bank: usize) -> String {
        format!("Bank {}", bank + 1)
    }

    /// Number of items of the given kind the device holds.
    fn number_of_data_items(&self, kind: DataKind) -> usize;

    /// Determine what a raw SysEx message carries.
    fn classify(&self, raw: &[u8]) -> MessageKind;

    /// The device's typed global settings, if it has any.
    fn global_settings(&self) -> Option<&GlobalSettings> {
        None
    }
}

/// Sequential Prophet Rev2.
#[derive(Debug)]
pub struct Rev2 {
    settings: GlobalSettings,
}

impl Rev2 {
    /// Create the device model. Setting changes are reported on `events` when given.
    pub fn new(channel: MidiChannel, events: Option<Sender<SettingEvent>>) -> Self {
        Self {
            settings: GlobalSettings::new(channel, events),
        }
    }

    /// Channel the synth listens on.
    pub fn channel(&self) -> MidiChannel {
        self.settings.channel()
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Decode a program from an edit buffer or program dump.
    pub fn patch_from_sysex(&self, raw: &[u8]) -> Result<Program> {
        Program::from_sysex(raw)
    }

    /// Encode a program for the edit buffer.
    pub fn patch_to_sysex(&self, program: &Program) -> Vec<u8> {
        program.to_edit_buffer_sysex()
    }

    /// Encode a program for storage at `number`.
    pub fn patch_to_program_dump_sysex(&self, program: &Program, number: ProgramNumber) -> Vec<u8> {
        program.to_program_dump_sysex(number)
    }

    /// Whether a message is a storable item of the given kind.
    pub fn is_data_file(&self, raw: &[u8], kind: DataKind) -> bool {
        match (kind, message::classify(raw)) {
            (DataKind::Patch, found) => found.is_program(),
            (DataKind::GlobalSettings, MessageKind::GlobalSettingsDump) => true,
            (DataKind::AlternateTuning, MessageKind::TuningDump) => TuningDump::parse(raw).is_ok(),
            _ => false,
        }
    }

    /// Build the request for item `item` of the given kind.
    pub fn request_data_item(&self, kind: DataKind, item: usize) -> Result<Vec<u8>> {
        let count = self.number_of_data_items(kind);
        if item >= count {
            return Err(Error::ValueOutOfRange {
                name: kind.name().to_string(),
                value: item as i32,
                min: 0,
                max: count as i32 - 1,
            });
        }
        Ok(match kind {
            DataKind::Patch => program_request(ProgramNumber::from_zero_based(item)),
            DataKind::GlobalSettings => global_settings_request(),
            DataKind::AlternateTuning => tuning::tuning_dump_request(TUNING_DEVICE_ID, item as u8),
        })
    }

    /// Messages that send a stored item back to the synth.
    ///
    /// Programs go to the edit buffer and tunings to the user tuning slot.
    /// Global settings only travel as individual parameter changes.
    pub fn data_item_to_messages(&self, kind: DataKind, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        match kind {
            DataKind::Patch => Ok(vec![edit_buffer_sysex(&ProgramBuffer::from_bytes(data)?)]),
            DataKind::GlobalSettings => Err(Error::UnsupportedDataKind(kind)),
            DataKind::AlternateTuning => {
                let tuning = TuningDump::parse(data)?;
                log::debug!("Sending tuning '{}' to user slot", tuning.name);
                Ok(vec![tuning.to_sysex(REV2_USER_TUNING_SLOT)])
            }
        }
    }

    /// The part of a stored item that decides duplicates.
    pub fn filter_voice_relevant_data(&self, kind: DataKind, data: &[u8]) -> Result<Vec<u8>> {
        fingerprint::filter_voice_relevant_data(kind, data)
    }

    /// Select which layer the panel edits and plays.
    pub fn switch_to_layer(&self, layer: Layer) -> Vec<u8> {
        Nrpn::new(NRPN_LAYER_SELECT, layer.index()).to_bytes(self.channel())
    }

    /// Move the synth to another channel.
    ///
    /// This is an edit of the "MIDI Channel" global setting. The message goes
    /// out on the current channel; afterwards the adapter addresses the synth
    /// on `channel`.
    pub fn change_input_channel(&self, channel: MidiChannel) -> Result<Vec<u8>> {
        // Zero selects omni on the synth, so channels are sent one-based
        let value = channel.one_based();
        let bytes = match self.settings.set_value(SETTING_MIDI_CHANNEL, value as i32)? {
            Some(bytes) => bytes,
            None => Nrpn::new(NRPN_MIDI_CHANNEL, value as u16).to_bytes(self.channel()),
        };
        log::info!("Rev2 now on MIDI channel {}", value);
        Ok(bytes)
    }

    pub fn set_midi_control(&self, enabled: bool) -> Vec<u8> {
        Nrpn::new(NRPN_MIDI_CONTROL, enabled as u16).to_bytes(self.channel())
    }

    pub fn set_local_control(&self, enabled: bool) -> Vec<u8> {
        Nrpn::new(NRPN_LOCAL_CONTROL, enabled as u16).to_bytes(self.channel())
    }
}

impl Default for Rev2 {
    fn default() -> Self {
        Self::new(MidiChannel::default(), None)
    }
}

impl Synth for Rev2 {
    fn name(&self) -> &str {
        "DSI Prophet Rev2"
    }

    fn number_of_banks(&self) -> usize {
        program::NUMBER_OF_BANKS
    }

    fn number_of_patches(&self) -> usize {
        program::PROGRAMS_PER_BANK
    }

    fn friendly_bank_name(&self, bank: usize) -> String {
        program::friendly_bank_name(bank)
    }

    fn number_of_data_items(&self, kind: DataKind) -> usize {
        match kind {
            DataKind::Patch => self.number_of_banks() * self.number_of_patches(),
            DataKind::GlobalSettings => 1,
            DataKind::AlternateTuning => REV2_TUNING_COUNT,
        }
    }

    fn classify(&self, raw: &[u8]) -> MessageKind {
        message::classify(raw)
    }

    fn global_settings(&self) -> Option<&GlobalSettings> {
        Some(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::TuningEntry;
    use crossbeam_channel::unbounded;

    struct BareSynth;

    impl Synth for BareSynth {
        fn name(&self) -> &str {
            "Bare"
        }

        fn number_of_banks(&self) -> usize {
            1
        }

        fn number_of_patches(&self) -> usize {
            64
        }

        fn number_of_data_items(&self, kind: DataKind) -> usize {
            match kind {
                DataKind::Patch => 64,
                _ => 0,
            }
        }

        fn classify(&self, _raw: &[u8]) -> MessageKind {
            MessageKind::Unknown
        }
    }

    fn channel(one_based: u8) -> MidiChannel {
        MidiChannel::from_one_based(one_based).unwrap()
    }

    fn tuning_dump(program: u8) -> Vec<u8> {
        TuningDump {
            device_id: 0x7F,
            program,
            name: "Just".to_string(),
            entries: (0..128)
                .map(|n| TuningEntry { semitone: n as u8, fraction: 100 })
                .collect(),
        }
        .to_sysex(program)
    }

    #[test]
    fn test_global_settings_capability() {
        let synths: Vec<Box<dyn Synth>> = vec![Box::new(Rev2::default()), Box::new(BareSynth)];
        let with_settings: Vec<&str> = synths
            .iter()
            .filter(|s| s.global_settings().is_some())
            .map(|s| s.name())
            .collect();
        assert_eq!(with_settings, vec!["DSI Prophet Rev2"]);
        assert_eq!(BareSynth.friendly_bank_name(0), "Bank 1");
    }

    #[test]
    fn test_item_counts() {
        let rev2 = Rev2::default();
        assert_eq!(rev2.number_of_data_items(DataKind::Patch), 1024);
        assert_eq!(rev2.number_of_data_items(DataKind::GlobalSettings), 1);
        assert_eq!(rev2.number_of_data_items(DataKind::AlternateTuning), 17);
        assert_eq!(rev2.friendly_bank_name(7), "F4");
    }

    #[test]
    fn test_request_data_items() {
        let rev2 = Rev2::default();
        assert_eq!(
            rev2.request_data_item(DataKind::GlobalSettings, 0).unwrap(),
            vec![0xF0, 0x01, 0x2F, 0x0E, 0xF7]
        );
        assert_eq!(
            rev2.request_data_item(DataKind::AlternateTuning, 3).unwrap(),
            vec![0xF0, 0x7E, 0x01, 0x08, 0x00, 0x03, 0xF7]
        );
        assert_eq!(
            rev2.request_data_item(DataKind::Patch, 129).unwrap(),
            vec![0xF0, 0x01, 0x2F, 0x05, 0x01, 0x01, 0xF7]
        );
        assert!(matches!(
            rev2.request_data_item(DataKind::AlternateTuning, 17),
            Err(Error::ValueOutOfRange { max: 16, .. })
        ));
    }

    #[test]
    fn test_global_settings_cannot_be_sent_whole() {
        let rev2 = Rev2::default();
        assert_eq!(
            rev2.data_item_to_messages(DataKind::GlobalSettings, &[0; 28]).unwrap_err(),
            Error::UnsupportedDataKind(DataKind::GlobalSettings)
        );
    }

    #[test]
    fn test_tuning_is_retargeted_to_user_slot() {
        let rev2 = Rev2::default();
        let dump = tuning_dump(3);
        assert!(rev2.is_data_file(&dump, DataKind::AlternateTuning));

        let messages = rev2.data_item_to_messages(DataKind::AlternateTuning, &dump).unwrap();
        assert_eq!(messages.len(), 1);
        let sent = TuningDump::parse(&messages[0]).unwrap();
        assert_eq!(sent.program, REV2_USER_TUNING_SLOT);
        assert_eq!(sent.name, "Just");
        assert_eq!(sent.entries, TuningDump::parse(&dump).unwrap().entries);
    }

    #[test]
    fn test_patch_round_trip_through_device() {
        let rev2 = Rev2::default();
        let mut buffer = ProgramBuffer::zeroed();
        buffer.set_layer_name(Layer::A, "Brass");
        let program = Program::new(buffer);

        let sysex = rev2.patch_to_sysex(&program);
        assert!(rev2.is_data_file(&sysex, DataKind::Patch));
        assert_eq!(rev2.patch_from_sysex(&sysex).unwrap().name(), "Brass");

        let messages = rev2
            .data_item_to_messages(DataKind::Patch, program.buffer.as_bytes())
            .unwrap();
        assert_eq!(messages, vec![sysex]);

        let dump = rev2.patch_to_program_dump_sysex(&program, ProgramNumber::new(2, 5));
        assert_eq!(
            rev2.patch_from_sysex(&dump).unwrap().number,
            Some(ProgramNumber::new(2, 5))
        );
    }

    #[test]
    fn test_nrpn_helpers_use_current_channel() {
        let rev2 = Rev2::new(channel(2), None);
        assert_eq!(rev2.switch_to_layer(Layer::B)[..3], [0xB1, 99, 32]);
        assert_eq!(rev2.switch_to_layer(Layer::B)[11], 1);
        assert_eq!(rev2.set_local_control(false)[5], 11);
        assert_eq!(rev2.set_midi_control(true)[11], 1);
    }

    #[test]
    fn test_change_input_channel() {
        let (tx, _rx) = unbounded();
        let rev2 = Rev2::new(channel(1), Some(tx));
        let bytes = rev2.change_input_channel(channel(5)).unwrap();
        // Sent on the old channel, carrying the one-based new channel
        assert_eq!(bytes, vec![0xB0, 99, 32, 0xB0, 98, 2, 0xB0, 6, 0, 0xB0, 38, 5]);
        assert_eq!(rev2.channel(), channel(5));
        assert_eq!(rev2.settings().get("MIDI Channel").unwrap().value(), 5);

        // Asking again still produces the message
        let again = rev2.change_input_channel(channel(5)).unwrap();
        assert_eq!(again[0], 0xB4);
    }

    #[test]
    fn test_loaded_channel_setting_moves_device() {
        let rev2 = Rev2::new(channel(1), None);
        let mut payload = vec![12, 50, 3];
        payload.resize(28, 0);
        let mut body = vec![0x01, 0x2F, 0x0F];
        body.extend_from_slice(&payload);
        rev2.settings().apply_dump(&message::frame(&body)).unwrap();
        assert_eq!(rev2.channel(), channel(3));
        assert_eq!(rev2.switch_to_layer(Layer::B)[0], 0xB2);
    }

    #[test]
    fn test_voice_relevant_data_ignores_name() {
        let rev2 = Rev2::default();
        let mut a = ProgramBuffer::zeroed();
        let mut b = ProgramBuffer::zeroed();
        a.set_layer_name(Layer::A, "One");
        b.set_layer_name(Layer::A, "Two");
        assert_eq!(
            rev2.filter_voice_relevant_data(DataKind::Patch, a.as_bytes()).unwrap(),
            rev2.filter_voice_relevant_data(DataKind::Patch, &b.as_bytes()[..2046]).unwrap()
        );
    }
}
