//! Mod compatibility scanner entry point.
//!
//! # Responsibility
//! - Load host symbols and scan config, then run the loader over module files.
//! - Print one JSON summary per run and optionally write rewritten modules.
//!
//! # Invariants
//! - A module that cannot be read or decoded is reported, never fatal to the
//!   rest of the batch.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use modcompat_core::{
    default_log_level, init_logging, HostVersion, InstructionRegistry, LoadOutcome, LogMonitor,
    ModLoader, ModSource, PatchState, ScanConfig, ScanMode, SymbolTable,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "modcompat", version, about = "Rewrite and validate mod modules before load")]
struct Args {
    /// Host symbol table (JSON).
    #[arg(long)]
    symbols: PathBuf,

    /// Scan config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config's scan mode (normal|heightened).
    #[arg(long)]
    mode: Option<String>,

    /// Overrides the config's host version (major.minor.patch).
    #[arg(long)]
    host_version: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rotated log files. Logging is off when omitted.
    #[arg(long)]
    log_dir: Option<String>,

    /// Writes rewritten modules of loaded mods here.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Module files to scan.
    #[arg(required = true)]
    modules: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_dir) = &args.log_dir {
        let level = args.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let config = scan_config(&args)?;
    let symbols_json = std::fs::read_to_string(&args.symbols)
        .with_context(|| format!("failed to read symbols `{}`", args.symbols.display()))?;
    let symbols = SymbolTable::from_json_str(&symbols_json).context("invalid symbol table")?;
    let registry =
        InstructionRegistry::standard(&config, &symbols).context("failed to build registry")?;
    info!(
        "event=cli_start module=cli status=ok handlers={} modules={}",
        registry.len(),
        args.modules.len()
    );

    let monitor = LogMonitor::new("modcompat");
    let loader =
        ModLoader::new(&registry, &symbols, &config, &monitor).with_patch_state(PatchState::new());

    let mut read_errors = Vec::new();
    let mut sources = Vec::new();
    for path in &args.modules {
        match ModSource::read(path) {
            Ok(source) => sources.push(source),
            Err(err) => read_errors.push(json!({ "path": path, "error": err.to_string() })),
        }
    }

    let outcomes = loader.load_all(&sources);
    if let Some(output_dir) = &args.output_dir {
        write_modules(output_dir, &outcomes)?;
    }

    let summary = json!({
        "mode": config.mode.as_str(),
        "host_version": config.epoch.host_version.to_string(),
        "handlers": registry.len(),
        "mods": outcomes.iter().map(outcome_summary).collect::<Vec<_>>(),
        "unreadable": read_errors,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to render summary")?
    );
    Ok(())
}

fn scan_config(args: &Args) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if let Some(mode) = &args.mode {
        config.mode = ScanMode::parse(mode)?;
    }
    if let Some(version) = &args.host_version {
        config.epoch.host_version = HostVersion::parse(version)?;
    }
    config.validate()?;
    Ok(config)
}

fn outcome_summary(outcome: &LoadOutcome) -> Value {
    let report = outcome
        .report
        .as_ref()
        .and_then(|report| serde_json::to_value(report).ok())
        .unwrap_or(Value::Null);
    json!({
        "mod_id": outcome.mod_id,
        "decision": outcome.decision.as_str(),
        "error": outcome.error.as_ref().map(ToString::to_string),
        "report": report,
    })
}

fn write_modules(output_dir: &Path, outcomes: &[LoadOutcome]) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        bail!("output path `{}` is not a directory", output_dir.display());
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create `{}`", output_dir.display()))?;

    for outcome in outcomes {
        let Some(module) = &outcome.module else {
            continue;
        };
        let bytes = module
            .encode_lowered()
            .with_context(|| format!("failed to encode {}", outcome.mod_id))?;
        let path = output_dir.join(format!("{}.modc", outcome.mod_id));
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{scan_config, write_modules, Args};
    use clap::Parser;
    use modcompat_core::model::instruction::{Instruction, OpCode, Operand};
    use modcompat_core::model::module::{ModuleMethod, ModuleType};
    use modcompat_core::model::types::{AccessorFieldRef, FieldRef, MethodRef, TypeRef};
    use modcompat_core::{HostVersion, LoadDecision, LoadOutcome, ModuleDef, ScanMode};

    #[test]
    fn flags_override_config_defaults() {
        let args = Args::parse_from([
            "modcompat",
            "--symbols",
            "host.json",
            "--mode",
            "heightened",
            "--host-version",
            "1.2.33",
            "Mod.modc",
        ]);
        let config = scan_config(&args).expect("config should build");
        assert_eq!(config.mode, ScanMode::Heightened);
        assert_eq!(config.epoch.host_version, HostVersion::new(1, 2, 33));
    }

    #[test]
    fn rejects_unknown_mode() {
        let args = Args::parse_from(["modcompat", "--symbols", "h.json", "--mode", "x", "a"]);
        assert!(scan_config(&args).is_err());
    }

    #[test]
    fn writes_loaded_modules_in_physical_form() {
        let rain = TypeRef::new("Stardew Valley", "StardewValley.RainManager");
        let slot = Instruction::new(
            OpCode::LoadStaticField,
            Operand::AccessorField(AccessorFieldRef {
                accessor: MethodRef::new_static(rain.clone(), "get_Instance", rain.clone(), vec![]),
                field: FieldRef::new(rain, "isRaining", TypeRef::system("System.Boolean")),
            }),
        );
        let module = ModuleDef::new("Weather", "Weather").with_type(
            ModuleType::new("Weather.ModEntry").with_method(ModuleMethod::new("Entry", vec![slot])),
        );
        let outcomes = vec![
            LoadOutcome {
                mod_id: "Weather".to_string(),
                decision: LoadDecision::AcceptWithWarnings,
                report: None,
                module: Some(module),
                error: None,
            },
            LoadOutcome {
                mod_id: "Broken".to_string(),
                decision: LoadDecision::Reject,
                report: None,
                module: None,
                error: None,
            },
        ];
        let dir = tempfile::tempdir().expect("temp dir");

        write_modules(dir.path(), &outcomes).expect("modules written");

        let bytes = std::fs::read(dir.path().join("Weather.modc")).expect("weather written");
        let written = ModuleDef::decode(&bytes).expect("written module decodes");
        assert_eq!(written.instruction_count(), 2);
        assert_eq!(
            written.instruction(0, 0, 1).map(|instruction| instruction.opcode),
            Some(OpCode::LoadField)
        );
        assert!(!dir.path().join("Broken.modc").exists());
    }
}
