//! rev2lib - Command line librarian for the Sequential Prophet Rev2
//!
//! Works on `.syx` files as recorded from the synth or sent back to it.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::unbounded;
use serde::Serialize;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use rev2lib_core::{
    message, sequencer, split_sysex, DataKind, IdentityKey, MessageKind, Program, Rev2,
    SettingEvent, Synth, TuningDump,
};

use config::Config;

#[derive(Parser)]
#[command(name = "rev2lib")]
#[command(author, version, about = "Librarian tools for the Sequential Prophet Rev2", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/rev2lib/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// MIDI channel of the synth (1-16)
    #[arg(long, global = true)]
    channel: Option<u8>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the messages in a .syx file
    Inspect {
        file: PathBuf,
    },
    /// Find programs that sound the same across .syx files
    Dedupe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Write one copy of every distinct program to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the global settings in a main parameter dump
    Settings {
        file: PathBuf,
    },
    /// Change a global setting and print the MIDI bytes that apply it
    Set {
        name: String,
        #[arg(allow_negative_numbers = true)]
        value: i32,
        /// Main parameter dump with the current settings
        #[arg(long)]
        from: Option<PathBuf>,
        /// Write the MIDI bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Turn poly sequencer track 1 into a gated sequence
    ToGated {
        input: PathBuf,
        output: PathBuf,
        /// Gated track receiving the notes; velocities go to the next one
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
        track: u8,
    },
    /// Copy the sequencer data of one program into another
    CopySeq {
        target: PathBuf,
        source: PathBuf,
        output: PathBuf,
    },
    /// Clear the poly sequencer of a program
    ClearSeq {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = LayerSelection::Both)]
        layer: LayerSelection,
    },
    /// Build a request message for the synth
    Request {
        #[command(subcommand)]
        item: RequestItem,
        /// Write the request to this file instead of printing it
        #[arg(short, long, global = true)]
        output: Option<PathBuf>,
    },
    /// Create a configuration file, taking --channel and --json as its values
    Init,
    /// Show the configuration file path
    ConfigPath,
}

#[derive(Subcommand)]
enum RequestItem {
    /// The current edit buffer
    EditBuffer,
    /// A stored program, numbered 0-1023 across all banks
    Patch { number: usize },
    /// The global parameters
    Settings,
    /// An alternate tuning (0-16)
    Tuning { number: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayerSelection {
    A,
    B,
    Both,
}

impl LayerSelection {
    fn layers(self) -> (bool, bool) {
        match self {
            LayerSelection::A => (true, false),
            LayerSelection::B => (false, true),
            LayerSelection::Both => (true, true),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => Config::config_path()?,
            };
            Config::create_config_file(&path, cli.channel, cli.json)?;
            println!("Created config at: {}", path.display());
            return Ok(());
        }
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        _ => {}
    }

    // Load config
    let mut config = if let Some(path) = &cli.config {
        Config::load_from(path)?
    } else {
        Config::load_or_default()
    };

    // Apply CLI overrides
    if let Some(channel) = cli.channel {
        config.device.channel = channel;
    }
    if cli.json {
        config.output.json = true;
    }

    match cli.command {
        Commands::Inspect { file } => inspect(&config, &file),
        Commands::Dedupe { files, output } => dedupe(&config, &files, output.as_deref()),
        Commands::Settings { file } => show_settings(&config, &file),
        Commands::Set {
            name,
            value,
            from,
            output,
        } => set_setting(&config, &name, value, from.as_deref(), output.as_deref()),
        Commands::ToGated {
            input,
            output,
            track,
        } => {
            let edit_buffer = first_edit_buffer(&input)?;
            let converted =
                sequencer::patch_poly_sequence_to_gated_track(&edit_buffer, track as usize - 1)
                    .context("Failed to convert the poly sequence")?;
            write_syx(&output, &converted)?;
            println!("Wrote gated sequence on tracks {}-{} to {}", track, track + 1, output.display());
            Ok(())
        }
        Commands::CopySeq {
            target,
            source,
            output,
        } => {
            let edit_buffer = first_edit_buffer(&target)?;
            let source_data = read_syx(&source)?;
            let locked = first_program_message(&source_data)
                .with_context(|| format!("No program found in {}", source.display()))?;
            let copied = sequencer::copy_sequencers_from_other(&edit_buffer, locked)
                .context("Failed to copy the sequencer data")?;
            write_syx(&output, &copied)?;
            println!("Wrote program with copied sequences to {}", output.display());
            Ok(())
        }
        Commands::ClearSeq {
            input,
            output,
            layer,
        } => {
            let (layer_a, layer_b) = layer.layers();
            let edit_buffer = first_edit_buffer(&input)?;
            let cleared = sequencer::clear_poly_sequencer(&edit_buffer, layer_a, layer_b)
                .context("Failed to clear the poly sequencer")?;
            write_syx(&output, &cleared)?;
            println!("Wrote program with cleared poly sequencer to {}", output.display());
            Ok(())
        }
        Commands::Request { item, output } => request(&config, item, output.as_deref()),
        Commands::Init | Commands::ConfigPath => Ok(()),
    }
}

fn read_syx(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_syx(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn first_program_message(data: &[u8]) -> Option<&[u8]> {
    split_sysex(data)
        .into_iter()
        .find(|m| message::classify(m).is_program())
}

/// The first program in a file, as an edit buffer dump.
fn first_edit_buffer(path: &Path) -> Result<Vec<u8>> {
    let data = read_syx(path)?;
    let Some(raw) = first_program_message(&data) else {
        bail!("No program found in {}", path.display());
    };
    match message::classify(raw) {
        MessageKind::EditBufferDump => Ok(raw.to_vec()),
        _ => {
            let program = Program::from_sysex(raw)
                .with_context(|| format!("Failed to decode program in {}", path.display()))?;
            log::debug!("Using program dump '{}' as edit buffer", program.name());
            Ok(program.to_edit_buffer_sysex())
        }
    }
}

fn short_identity(key: &IdentityKey) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(Debug, Serialize)]
struct MessageReport {
    index: usize,
    length: usize,
    #[serde(flatten)]
    kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn describe_message(index: usize, raw: &[u8]) -> MessageReport {
    let kind = message::classify(raw);
    let mut report = MessageReport {
        index,
        length: raw.len(),
        kind,
        name: None,
        identity: None,
        error: None,
    };

    if kind.is_program() {
        match Program::from_sysex(raw) {
            Ok(program) => {
                report.name = Some(program.name());
                report.identity = Some(short_identity(&program.identity()));
            }
            Err(e) => report.error = Some(e.to_string()),
        }
    } else if kind == MessageKind::TuningDump {
        match TuningDump::parse(raw) {
            Ok(tuning) => report.name = Some(tuning.name),
            Err(e) => report.error = Some(e.to_string()),
        }
    }
    report
}

fn inspect(config: &Config, file: &Path) -> Result<()> {
    let data = read_syx(file)?;
    let reports: Vec<MessageReport> = split_sysex(&data)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| describe_message(index, raw))
        .collect();

    if config.output.json {
        return print_json(&reports);
    }

    println!("{}: {} messages", file.display(), reports.len());
    for report in &reports {
        let mut line = format!(
            "{:>4}  {:<40} {:>6} bytes",
            report.index,
            report.kind.to_string(),
            report.length
        );
        if let Some(name) = &report.name {
            line.push_str(&format!("  '{}'", name));
        }
        if let Some(identity) = &report.identity {
            line.push_str(&format!("  [{}]", identity));
        }
        if let Some(error) = &report.error {
            line.push_str(&format!("  error: {}", error));
        }
        println!("{}", line);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DedupeGroup {
    name: String,
    identity: String,
    sources: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DedupeReport {
    programs: usize,
    unique: usize,
    duplicates: Vec<DedupeGroup>,
}

fn dedupe(config: &Config, files: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();
    let mut groups: Vec<DedupeGroup> = Vec::new();
    let mut unique_messages: Vec<u8> = Vec::new();
    let mut programs = 0;

    for file in files {
        let data = read_syx(file)?;
        for (position, raw) in split_sysex(&data).into_iter().enumerate() {
            if !message::classify(raw).is_program() {
                continue;
            }
            let program = match Program::from_sysex(raw) {
                Ok(program) => program,
                Err(e) => {
                    log::warn!("Skipping message {} in {}: {}", position, file.display(), e);
                    continue;
                }
            };
            programs += 1;

            let source = match program.number {
                Some(number) => format!("{}#{} ({})", file.display(), position, number),
                None => format!("{}#{}", file.display(), position),
            };
            let key = program.identity();
            match index.entry(key) {
                Entry::Occupied(slot) => groups[*slot.get()].sources.push(source),
                Entry::Vacant(slot) => {
                    let identity = short_identity(slot.key());
                    slot.insert(groups.len());
                    groups.push(DedupeGroup {
                        name: program.name(),
                        identity,
                        sources: vec![source],
                    });
                    unique_messages.extend_from_slice(raw);
                }
            }
        }
    }

    let unique = groups.len();
    let report = DedupeReport {
        programs,
        unique,
        duplicates: groups.into_iter().filter(|g| g.sources.len() > 1).collect(),
    };

    if let Some(path) = output {
        write_syx(path, &unique_messages)?;
        log::info!("Wrote {} distinct programs to {}", unique, path.display());
    }

    if config.output.json {
        return print_json(&report);
    }

    println!("{} programs, {} distinct", report.programs, report.unique);
    for group in &report.duplicates {
        println!("'{}' [{}]", group.name, group.identity);
        for source in &group.sources {
            println!("    {}", source);
        }
    }
    Ok(())
}

fn find_settings_dump(data: &[u8]) -> Option<&[u8]> {
    split_sysex(data)
        .into_iter()
        .find(|m| message::classify(m) == MessageKind::GlobalSettingsDump)
}

fn show_settings(config: &Config, file: &Path) -> Result<()> {
    let (tx, rx) = unbounded();
    let rev2 = Rev2::new(config.device.midi_channel()?, Some(tx));
    let settings = rev2
        .global_settings()
        .context("Device has no global settings")?;

    let data = read_syx(file)?;
    let dump = find_settings_dump(&data)
        .with_context(|| format!("No global settings dump in {}", file.display()))?;
    settings.apply_dump(dump)?;
    let loaded = rx
        .try_iter()
        .filter(|event| matches!(event, SettingEvent::Loaded { .. }))
        .count();
    log::debug!("Loaded {} settings from {}", loaded, file.display());

    let report = settings.report();
    if config.output.json {
        return print_json(&report);
    }

    let mut category = "";
    for setting in &report {
        if setting.category != category {
            category = setting.category;
            println!("[{}]", category);
        }
        println!("  {:<24} {}", setting.name, setting.text);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct LiveUpdateReport {
    name: &'static str,
    value: i32,
    parameter: u16,
    data: u16,
    bytes: String,
}

fn set_setting(
    config: &Config,
    name: &str,
    value: i32,
    from: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let (tx, rx) = unbounded();
    let rev2 = Rev2::new(config.device.midi_channel()?, Some(tx));
    let settings = rev2
        .global_settings()
        .context("Device has no global settings")?;

    if let Some(path) = from {
        let data = read_syx(path)?;
        let dump = find_settings_dump(&data)
            .with_context(|| format!("No global settings dump in {}", path.display()))?;
        settings.apply_dump(dump)?;
        // Only the user's change is of interest below
        rx.try_iter().for_each(drop);
    }

    let Some(bytes) = settings.set_value(name, value)? else {
        println!("{} is already {}", name, value);
        return Ok(());
    };

    for event in rx.try_iter() {
        let SettingEvent::LiveUpdate {
            name,
            value,
            nrpn,
            bytes,
        } = event
        else {
            continue;
        };
        let report = LiveUpdateReport {
            name,
            value,
            parameter: nrpn.parameter,
            data: nrpn.value,
            bytes: hex(&bytes),
        };
        if config.output.json {
            print_json(&report)?;
        } else {
            println!(
                "{} = {} (NRPN {} value {}): {}",
                report.name, report.value, report.parameter, report.data, report.bytes
            );
        }
    }

    if let Some(path) = output {
        write_syx(path, &bytes)?;
    }
    Ok(())
}

fn request(config: &Config, item: RequestItem, output: Option<&Path>) -> Result<()> {
    let rev2 = Rev2::new(config.device.midi_channel()?, None);
    let bytes = match item {
        RequestItem::EditBuffer => message::edit_buffer_request(),
        RequestItem::Patch { number } => rev2.request_data_item(DataKind::Patch, number)?,
        RequestItem::Settings => rev2.request_data_item(DataKind::GlobalSettings, 0)?,
        RequestItem::Tuning { number } => rev2.request_data_item(DataKind::AlternateTuning, number)?,
    };

    match output {
        Some(path) => write_syx(path, &bytes),
        None => {
            println!("{}", hex(&bytes));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rev2lib_core::{Layer, ProgramBuffer, ProgramNumber};

    fn named_program(name: &str) -> Program {
        let mut buffer = ProgramBuffer::zeroed();
        buffer.set_layer_name(Layer::A, name);
        Program::new(buffer)
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0xF0, 0x01, 0x2F]), "F0 01 2F");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_first_edit_buffer_converts_program_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.syx");
        let program = named_program("Strings");
        let mut data = message::global_settings_request();
        data.extend(program.to_program_dump_sysex(ProgramNumber::new(1, 3)));
        fs::write(&path, &data).unwrap();

        let edit_buffer = first_edit_buffer(&path).unwrap();
        assert_eq!(message::classify(&edit_buffer), MessageKind::EditBufferDump);
        assert_eq!(edit_buffer, program.to_edit_buffer_sysex());
    }

    #[test]
    fn test_first_edit_buffer_without_program() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.syx");
        fs::write(&path, message::edit_buffer_request()).unwrap();
        assert!(first_edit_buffer(&path).is_err());
    }

    #[test]
    fn test_describe_program_message() {
        let sysex = named_program("Pluck").to_edit_buffer_sysex();
        let report = describe_message(2, &sysex);
        assert_eq!(report.kind, MessageKind::EditBufferDump);
        assert_eq!(report.name.as_deref(), Some("Pluck"));
        assert!(report.identity.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "edit_buffer_dump");
        assert_eq!(json["index"], 2);
    }

    #[test]
    fn test_renamed_programs_share_identity() {
        let a = named_program("One");
        let b = named_program("Two");
        assert_eq!(short_identity(&a.identity()), short_identity(&b.identity()));
    }

    #[test]
    fn test_layer_selection() {
        assert_eq!(LayerSelection::A.layers(), (true, false));
        assert_eq!(LayerSelection::Both.layers(), (true, true));
    }
}
