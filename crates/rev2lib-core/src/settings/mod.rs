//! Global settings of the Rev2.
//!
//! The Rev2 sends its global parameters as one unpacked main parameter dump
//! (`01 2F 0F …`) and accepts changes to them as individual NRPN messages.
//!
//! - [`definitions`] - the static, ordered table describing each parameter
//! - [`registry`] - pure load/change conversions and the runtime
//!   [`GlobalSettings`] collection that notifies an observer over a channel

pub mod definitions;
pub mod registry;

pub use definitions::{
    find_definition, GlobalSettingDefinition, SettingKind, ALTERNATE_TUNINGS, REV2_GLOBAL_SETTINGS,
};
pub use registry::{
    definition, dump_payload, load, load_sysex, on_value_changed, GlobalSettings, SettingEvent,
    SettingReport, TypedSetting,
};
