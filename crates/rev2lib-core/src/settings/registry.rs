//! Runtime global settings of one Rev2 and their conversion to and from the wire.

use std::sync::{PoisonError, RwLock};

use crossbeam_channel::Sender;
use serde::Serialize;

use super::definitions::{find_definition, GlobalSettingDefinition, REV2_GLOBAL_SETTINGS};
use crate::error::{Error, Result};
use crate::message::{classify, sysex_body, MessageKind, GLOBAL_SETTINGS_PAYLOAD_OFFSET};
use crate::nrpn::{MidiChannel, Nrpn};

/// Parameter number of the "MIDI Channel" setting, the channel the synth listens on.
const MIDI_CHANNEL_NRPN: u16 = 4098;

/// Read displayed values for every definition covered by a global parameter dump.
///
/// `dump` is the payload after the `01 2F 0F` header. Definitions whose byte
/// lies beyond the end of the dump are skipped, so partial dumps load what
/// they contain.
pub fn load(dump: &[u8]) -> Vec<(&'static GlobalSettingDefinition, i32)> {
    REV2_GLOBAL_SETTINGS
        .iter()
        .filter_map(|def| {
            dump.get(def.sysex_index)
                .map(|&stored| (def, def.displayed_value(stored)))
        })
        .collect()
}

/// Like [`load`], starting from a complete main parameter dump message.
pub fn load_sysex(raw: &[u8]) -> Result<Vec<(&'static GlobalSettingDefinition, i32)>> {
    match classify(raw) {
        MessageKind::GlobalSettingsDump => {
            Ok(load(&sysex_body(raw)[GLOBAL_SETTINGS_PAYLOAD_OFFSET..]))
        }
        other => Err(Error::MalformedFrame(format!(
            "expected a global settings dump, got {}",
            other
        ))),
    }
}

/// Build the live-update message for a new displayed value.
pub fn on_value_changed(definition: &GlobalSettingDefinition, displayed: i32) -> Result<Nrpn> {
    if !definition.contains(displayed) {
        let (min, max) = definition.range();
        return Err(Error::ValueOutOfRange {
            name: definition.name.to_string(),
            value: displayed,
            min,
            max,
        });
    }
    let stored = definition.stored_value(displayed);
    Ok(Nrpn::new(definition.nrpn, stored as u16))
}

/// Notification sent to the observer of a [`GlobalSettings`] collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingEvent {
    /// A value was taken over from a dump received from the synth.
    Loaded { name: &'static str, value: i32 },
    /// The user changed a value; `bytes` must be sent to the synth.
    LiveUpdate {
        name: &'static str,
        value: i32,
        nrpn: Nrpn,
        bytes: Vec<u8>,
    },
}

/// One global setting with its current displayed value.
#[derive(Debug)]
pub struct TypedSetting {
    definition: &'static GlobalSettingDefinition,
    value: RwLock<i32>,
}

impl TypedSetting {
    fn new(definition: &'static GlobalSettingDefinition) -> Self {
        Self {
            definition,
            value: RwLock::new(definition.default),
        }
    }

    pub fn definition(&self) -> &'static GlobalSettingDefinition {
        self.definition
    }

    pub fn name(&self) -> &'static str {
        self.definition.name
    }

    pub fn value(&self) -> i32 {
        *self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn value_text(&self) -> String {
        self.definition.value_text(self.value())
    }
}

/// Displayable snapshot of one setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingReport {
    pub name: &'static str,
    pub category: &'static str,
    pub value: i32,
    pub text: String,
}

/// The typed global settings of a device model.
///
/// Each setting has its own lock. A write holds it across the value update
/// and the generation of the outgoing message, so a dump load and a user
/// edit of the same setting never interleave. Settings are independent of
/// each other and readers never wait on other settings.
#[derive(Debug)]
pub struct GlobalSettings {
    settings: Vec<TypedSetting>,
    channel: RwLock<MidiChannel>,
    events: Option<Sender<SettingEvent>>,
}

impl GlobalSettings {
    /// Create the settings with their default values.
    ///
    /// The "MIDI Channel" setting starts out as `channel`. From then on it is
    /// the only source of the channel live updates are sent on.
    pub fn new(channel: MidiChannel, events: Option<Sender<SettingEvent>>) -> Self {
        let settings: Vec<TypedSetting> = REV2_GLOBAL_SETTINGS.iter().map(TypedSetting::new).collect();
        for setting in settings.iter().filter(|s| s.definition.nrpn == MIDI_CHANNEL_NRPN) {
            *setting.value.write().unwrap_or_else(PoisonError::into_inner) =
                channel.one_based() as i32;
        }
        Self {
            settings,
            channel: RwLock::new(channel),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedSetting> {
        self.settings.iter()
    }

    /// Find a setting by display name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&TypedSetting> {
        self.settings
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Channel live updates are sent on.
    pub fn channel(&self) -> MidiChannel {
        *self.channel.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Follow a new value of the "MIDI Channel" setting.
    ///
    /// Zero is omni: the synth then hears every channel, so the current one
    /// is kept.
    fn follow_channel(&self, definition: &GlobalSettingDefinition, displayed: i32) {
        if definition.nrpn != MIDI_CHANNEL_NRPN {
            return;
        }
        let Some(channel) = u8::try_from(displayed).ok().and_then(MidiChannel::from_one_based) else {
            return;
        };
        *self.channel.write().unwrap_or_else(PoisonError::into_inner) = channel;
    }

    /// Take over all values contained in a global parameter payload.
    ///
    /// Returns the number of settings that were covered by the dump.
    pub fn apply_values(&self, dump: &[u8]) -> usize {
        let loaded = load(dump);
        if loaded.len() < self.settings.len() {
            log::warn!(
                "Global dump of {} bytes covers only {} of {} settings",
                dump.len(),
                loaded.len(),
                self.settings.len()
            );
        }

        for (definition, value) in &loaded {
            let Some(setting) = self.settings.iter().find(|s| s.definition == *definition) else {
                continue;
            };
            let mut current = setting.value.write().unwrap_or_else(PoisonError::into_inner);
            *current = *value;
            self.follow_channel(definition, *value);
            self.notify(SettingEvent::Loaded {
                name: definition.name,
                value: *value,
            });
        }
        loaded.len()
    }

    /// Take over all values from a main parameter dump message.
    pub fn apply_dump(&self, raw: &[u8]) -> Result<usize> {
        match classify(raw) {
            MessageKind::GlobalSettingsDump => {
                Ok(self.apply_values(&sysex_body(raw)[GLOBAL_SETTINGS_PAYLOAD_OFFSET..]))
            }
            other => Err(Error::MalformedFrame(format!(
                "expected a global settings dump, got {}",
                other
            ))),
        }
    }

    /// User edit of a setting.
    ///
    /// Returns the MIDI bytes to send, or `None` when the value did not
    /// change. The same bytes are also sent to the observer.
    pub fn set_value(&self, name: &str, displayed: i32) -> Result<Option<Vec<u8>>> {
        let setting = self
            .get(name)
            .ok_or_else(|| Error::UnknownSetting(name.to_string()))?;

        let mut current = setting.value.write().unwrap_or_else(PoisonError::into_inner);
        if *current == displayed {
            return Ok(None);
        }

        let nrpn = on_value_changed(setting.definition, displayed)?;
        *current = displayed;

        // Sent on the old channel when the channel itself changes
        let bytes = nrpn.to_bytes(self.channel());
        self.follow_channel(setting.definition, displayed);
        log::info!(
            "Setting {} to {}",
            setting.name(),
            setting.definition.value_text(displayed)
        );
        self.notify(SettingEvent::LiveUpdate {
            name: setting.name(),
            value: displayed,
            nrpn,
            bytes: bytes.clone(),
        });
        Ok(Some(bytes))
    }

    /// Snapshot of all settings for display.
    pub fn report(&self) -> Vec<SettingReport> {
        self.settings
            .iter()
            .map(|s| {
                let value = s.value();
                SettingReport {
                    name: s.name(),
                    category: s.definition.category,
                    value,
                    text: s.definition.value_text(value),
                }
            })
            .collect()
    }

    fn notify(&self, event: SettingEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                log::debug!("Setting observer has gone away");
            }
        }
    }
}

/// Build a full global parameter dump payload for the given values.
///
/// Bytes not covered by any definition are zero. Stored values are clamped
/// to `0..=127`, the range of a SysEx data byte.
pub fn dump_payload(values: &[(&GlobalSettingDefinition, i32)]) -> Vec<u8> {
    let len = REV2_GLOBAL_SETTINGS
        .iter()
        .map(|d| d.sysex_index + 1)
        .max()
        .unwrap_or(0);
    let mut payload = vec![0u8; len];
    for (definition, displayed) in values {
        payload[definition.sysex_index] = definition.stored_value(*displayed).clamp(0, 0x7F) as u8;
    }
    payload
}

/// Look up a definition by name, as an error if it does not exist.
pub fn definition(name: &str) -> Result<&'static GlobalSettingDefinition> {
    find_definition(name).ok_or_else(|| Error::UnknownSetting(name.to_string()))
}
