//! Static table of the Rev2 global parameters.

use serde::Serialize;

/// How a setting's value is presented and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettingKind {
    /// Plain number within an inclusive range (displayed values).
    Integer { min: i32, max: i32 },
    /// Off/on; any nonzero stored value is on.
    Bool,
    /// One of a fixed set of labelled values.
    Lookup(&'static [(i32, &'static str)]),
}

/// One device-global parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalSettingDefinition {
    /// Byte offset inside the global parameter dump.
    pub sysex_index: usize,
    /// NRPN number used to change the setting live.
    pub nrpn: u16,
    pub name: &'static str,
    pub category: &'static str,
    pub kind: SettingKind,
    /// Displayed value a fresh device model starts with.
    pub default: i32,
    /// Added to the stored byte to get the displayed value.
    pub display_offset: i32,
}

impl GlobalSettingDefinition {
    /// Inclusive range of displayed values.
    pub fn range(&self) -> (i32, i32) {
        match self.kind {
            SettingKind::Integer { min, max } => (min, max),
            SettingKind::Bool => (0, 1),
            SettingKind::Lookup(labels) => {
                let min = labels.iter().map(|(v, _)| *v).min().unwrap_or(0);
                let max = labels.iter().map(|(v, _)| *v).max().unwrap_or(0);
                (min, max)
            }
        }
    }

    pub fn contains(&self, displayed: i32) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&displayed)
    }

    /// Label of a lookup value.
    pub fn label(&self, displayed: i32) -> Option<&'static str> {
        match self.kind {
            SettingKind::Lookup(labels) => labels
                .iter()
                .find(|(v, _)| *v == displayed)
                .map(|(_, text)| *text),
            _ => None,
        }
    }

    /// Displayed value for a raw byte from the dump.
    pub fn displayed_value(&self, stored: u8) -> i32 {
        let stored = match self.kind {
            SettingKind::Bool => (stored != 0) as i32,
            _ => stored as i32,
        };
        stored + self.display_offset
    }

    /// Value sent to the device for a displayed value.
    pub fn stored_value(&self, displayed: i32) -> i32 {
        displayed - self.display_offset
    }

    /// Human readable form of a displayed value.
    pub fn value_text(&self, displayed: i32) -> String {
        match self.kind {
            SettingKind::Integer { .. } => displayed.to_string(),
            SettingKind::Bool => (if displayed != 0 { "On" } else { "Off" }).to_string(),
            SettingKind::Lookup(_) => self
                .label(displayed)
                .map(str::to_string)
                .unwrap_or_else(|| format!("<{}>", displayed)),
        }
    }
}

/// Names of the alternate tunings built into the Rev2.
pub const ALTERNATE_TUNINGS: &[(i32, &str)] = &[
    (0, "12-Tone Equal Temperament"),
    (1, "Harmonic Series"),
    (2, "Carlos Harmonic Twelve Tone"),
    (3, "Meantone Temperament"),
    (4, "1/4 Tone Equal Temperament"),
    (5, "19 Tone Equal Temperament"),
    (6, "31 Tone Equal Temperament"),
    (7, "Pythagorean C"),
    (8, "Just Intonation in A with 7-limit Tritone at D#"),
    (9, "3-5 Lattice in A"),
    (10, "3-7 Lattice in A"),
    (11, "Other Music 7-Limit Black Keys in C"),
    (12, "Dan Schmidt Pelog/Slendro"),
    (13, "Yamaha Just Major C"),
    (14, "Yamaha Just Minor C"),
    (15, "Harry Partch 11-Limit 43 Just Intonation"),
    (16, "Arabic 12-Tone"),
];

const MIDI_CHANNELS: &[(i32, &str)] = &[
    (0, "Omni"),
    (1, "1"),
    (2, "2"),
    (3, "3"),
    (4, "4"),
    (5, "5"),
    (6, "6"),
    (7, "7"),
    (8, "8"),
    (9, "9"),
    (10, "10"),
    (11, "11"),
    (12, "12"),
    (13, "13"),
    (14, "14"),
    (15, "15"),
    (16, "16"),
];

const CLOCK_MODES: &[(i32, &str)] = &[
    (0, "Off"),
    (1, "Master"),
    (2, "Slave"),
    (3, "Slave Thru"),
    (4, "Slave No S/S"),
];

const CABLES: &[(i32, &str)] = &[(0, "MIDI"), (1, "USB")];
const OUT_SELECT: &[(i32, &str)] = &[(0, "MIDI"), (1, "USB"), (2, "MIDI+USB")];
const PARAM_TRANSFER: &[(i32, &str)] = &[(0, "Off"), (1, "CC"), (2, "NRPN")];
const ARP_BEAT_SYNC: &[(i32, &str)] = &[(0, "Off"), (1, "Quantize")];

const VELOCITY_CURVES: &[(i32, &str)] = &[
    (0, "Curve 1"),
    (1, "Curve 2"),
    (2, "Curve 3"),
    (3, "Curve 4"),
    (4, "Curve 5"),
    (5, "Curve 6"),
    (6, "Curve 7"),
    (7, "Curve 8"),
];

const PRESSURE_CURVES: &[(i32, &str)] = &[(0, "Curve 1"), (1, "Curve 2"), (2, "Curve 3"), (3, "Curve 4")];
const STEREO_MONO: &[(i32, &str)] = &[(0, "Stereo"), (1, "Mono")];
const POT_MODES: &[(i32, &str)] = &[(0, "Relative"), (1, "Pass Thru"), (2, "Jump")];

const SEQ_PEDAL_MODES: &[(i32, &str)] = &[
    (0, "Normal"),
    (1, "Trigger"),
    (2, "Gate"),
    (3, "Trigger+Gate"),
];

const FOOT_ASSIGN: &[(i32, &str)] = &[
    (0, "Breath CC2"),
    (1, "Foot CC4"),
    (2, "Exp CC11"),
    (3, "Volume"),
    (4, "LPF Full"),
    (5, "LPF Half"),
];

const SUSTAIN_POLARITY: &[(i32, &str)] = &[(0, "Normal"), (1, "Reversed")];
const SUSTAIN_ARP: &[(i32, &str)] = &[(0, "Arp Hold"), (1, "Sustain"), (2, "Arp Hold Mom")];

const fn setting(
    sysex_index: usize,
    nrpn: u16,
    name: &'static str,
    category: &'static str,
    kind: SettingKind,
    default: i32,
) -> GlobalSettingDefinition {
    GlobalSettingDefinition {
        sysex_index,
        nrpn,
        name,
        category,
        kind,
        default,
        display_offset: 0,
    }
}

/// Every Rev2 global parameter, in presentation order.
pub static REV2_GLOBAL_SETTINGS: &[GlobalSettingDefinition] = &[
    GlobalSettingDefinition {
        display_offset: -12,
        ..setting(0, 4097, "Master Coarse Tune", "Tuning", SettingKind::Integer { min: -12, max: 12 }, 0)
    },
    GlobalSettingDefinition {
        display_offset: -50,
        ..setting(1, 4096, "Master Fine Tune", "Tuning", SettingKind::Integer { min: -50, max: 50 }, 0)
    },
    setting(2, 4098, "MIDI Channel", "MIDI", SettingKind::Lookup(MIDI_CHANNELS), 0),
    setting(3, 4099, "MIDI Clock Mode", "MIDI", SettingKind::Lookup(CLOCK_MODES), 1),
    setting(4, 4100, "MIDI Clock Cable", "MIDI", SettingKind::Lookup(CABLES), 0),
    setting(5, 4101, "MIDI Param Send", "MIDI", SettingKind::Lookup(PARAM_TRANSFER), 2),
    setting(6, 4102, "MIDI Param Receive", "MIDI", SettingKind::Lookup(PARAM_TRANSFER), 2),
    setting(7, 4103, "MIDI Control Enable", "MIDI", SettingKind::Bool, 0),
    setting(22, 4118, "MIDI Prog Enable", "MIDI", SettingKind::Bool, 0),
    setting(26, 4125, "MIDI Prog Send", "MIDI", SettingKind::Bool, 0),
    setting(10, 4104, "MIDI Sysex Cable", "MIDI", SettingKind::Lookup(CABLES), 0),
    setting(9, 4105, "MIDI Out Select", "MIDI", SettingKind::Lookup(OUT_SELECT), 0),
    setting(11, 4123, "MIDI Arp+Seq", "MIDI", SettingKind::Bool, 0),
    setting(25, 4124, "Arp Beat Sync", "MIDI", SettingKind::Lookup(ARP_BEAT_SYNC), 0),
    setting(21, 4119, "MIDI MultiMode", "MIDI", SettingKind::Bool, 0),
    setting(12, 4107, "Local Control", "MIDI", SettingKind::Bool, 1),
    setting(17, 4113, "Velocity Curve", "Keyboard", SettingKind::Lookup(VELOCITY_CURVES), 0),
    setting(18, 4114, "Pressure Curve", "Keyboard", SettingKind::Lookup(PRESSURE_CURVES), 0),
    setting(19, 4115, "Stereo or Mono", "Audio Setup", SettingKind::Lookup(STEREO_MONO), 0),
    setting(14, 4109, "Pot Mode", "Front controls", SettingKind::Lookup(POT_MODES), 0),
    setting(16, 4116, "Alternative Tuning", "Scales", SettingKind::Lookup(ALTERNATE_TUNINGS), 0),
    setting(20, 4120, "Screen Saver", "General", SettingKind::Bool, 0),
    setting(13, 4111, "Seq Pedal Mode", "Controls", SettingKind::Lookup(SEQ_PEDAL_MODES), 0),
    setting(24, 4122, "Foot Assign", "Controls", SettingKind::Lookup(FOOT_ASSIGN), 0),
    setting(15, 4112, "Sustain polarity", "Controls", SettingKind::Lookup(SUSTAIN_POLARITY), 0),
    setting(23, 4121, "Sustain Arp", "Controls", SettingKind::Lookup(SUSTAIN_ARP), 0),
    setting(27, 4126, "Save Edit B", "Controls", SettingKind::Bool, 0),
];

/// Look up a definition by its display name, ignoring case.
pub fn find_definition(name: &str) -> Option<&'static GlobalSettingDefinition> {
    REV2_GLOBAL_SETTINGS
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(name))
}
