//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::file_artifact_adapter::FileArtifactAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::artifact::Artifact;
use crate::domain::config_validation::{validate_binding, validate_contracts, validate_layout};
use crate::domain::error::PendtagError;
use crate::domain::lookup::{DEFAULT_LOOKUP_BINDING, LookupTable};
use crate::domain::reconcile::{self, ReconcileSummary};
use crate::domain::scan::{self, ScanOptions, ScanReport};
use crate::domain::store::{Store, StoreLayout};
use crate::domain::verify::{self, TagListing};
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_ARTIFACT_PATH: &str = "futures_data.js";
pub const DEFAULT_BINDING: &str = "FUTURES_DATA";

#[derive(Parser, Debug)]
#[command(
    name = "pendtag",
    about = "Tag three-bar pending breakout patterns in an embedded price store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Artifact holding the store literal
    #[arg(short, long)]
    pub artifact: Option<PathBuf>,
    /// Name bound to the store literal
    #[arg(short, long)]
    pub binding: Option<String>,
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile pending tags and write the artifact back
    Patch {
        #[command(flatten)]
        target: TargetArgs,
        /// Reconcile and report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print grouped pattern listings without touching the artifact
    Scan {
        #[command(flatten)]
        target: TargetArgs,
        /// Require K > D for pending long and K < D for pending short
        #[arg(long)]
        require_kdj_cross: bool,
        /// Lookup table artifact used to resolve missing names
        #[arg(long)]
        lookup: Option<PathBuf>,
    },
    /// List instruments currently carrying a pending tag
    Verify {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Lookup table location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSource {
    pub path: PathBuf,
    pub binding: String,
}

/// Everything a command needs, resolved from arguments, config and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub artifact: PathBuf,
    pub binding: String,
    pub layout: StoreLayout,
    pub scan: ScanOptions,
    pub lookup: Option<LookupSource>,
}

pub fn run(cli: Cli) -> ExitCode {
    let reporter = TextReportAdapter::new();
    match cli.command {
        Command::Patch { target, dry_run } => with_settings(&target, None, None, |settings| {
            let port = FileArtifactAdapter::new(&settings.artifact);
            run_patch_pipeline(&port, settings, dry_run, &reporter, &mut io::stdout())
                .map(|_| ())
        }),
        Command::Scan {
            target,
            require_kdj_cross,
            lookup,
        } => with_settings(&target, Some(require_kdj_cross), lookup, |settings| {
            let port = FileArtifactAdapter::new(&settings.artifact);
            let table = settings.lookup.as_ref().and_then(load_lookup);
            run_scan_pipeline(&port, settings, table.as_ref(), &reporter, &mut io::stdout())
                .map(|_| ())
        }),
        Command::Verify { target } => with_settings(&target, None, None, |settings| {
            let port = FileArtifactAdapter::new(&settings.artifact);
            run_verify_pipeline(&port, settings, &reporter, &mut io::stdout()).map(|_| ())
        }),
    }
}

fn with_settings(
    target: &TargetArgs,
    require_kdj_cross: Option<bool>,
    lookup: Option<PathBuf>,
    body: impl FnOnce(&RunSettings) -> Result<(), PendtagError>,
) -> ExitCode {
    let config = match &target.config {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(code) => return code,
        },
        None => FileConfigAdapter::empty(),
    };

    let settings = match build_settings(target, require_kdj_cross, lookup, &config) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    match body(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn report_error(err: &PendtagError) -> ExitCode {
    eprintln!("error: {}: {}", err.phase(), err);
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PendtagError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        report_error(&err)
    })
}

/// Command-line values win over config values, which win over defaults.
pub fn build_settings(
    target: &TargetArgs,
    require_kdj_cross: Option<bool>,
    lookup: Option<PathBuf>,
    config: &dyn ConfigPort,
) -> Result<RunSettings, PendtagError> {
    let artifact = target
        .artifact
        .clone()
        .or_else(|| config.get_nonempty("artifact", "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_PATH));

    let binding = target
        .binding
        .clone()
        .or_else(|| config.get_nonempty("artifact", "binding"))
        .unwrap_or_else(|| DEFAULT_BINDING.to_string());
    validate_binding("artifact", &binding)?;

    let defaults = StoreLayout::default();
    let layout = StoreLayout {
        // present but blank means a flat record
        contract: match config.get_string("layout", "contract") {
            Some(v) => v.trim().to_string(),
            None => defaults.contract,
        },
        series: config
            .get_nonempty("layout", "series")
            .unwrap_or(defaults.series),
        summary: config
            .get_nonempty("layout", "summary")
            .unwrap_or(defaults.summary),
        tag: config.get_nonempty("layout", "tag").unwrap_or(defaults.tag),
    };
    validate_layout(&layout)?;

    let contracts = match config.get_string("scan", "contracts") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
        None => ScanOptions::default().contracts,
    };
    validate_contracts(&contracts)?;

    let scan = ScanOptions {
        require_kdj_cross: require_kdj_cross.unwrap_or(false)
            || config.get_bool("scan", "require_kdj_cross", false),
        contracts,
    };

    let lookup = lookup.or_else(|| config.get_nonempty("lookup", "path").map(PathBuf::from));
    let lookup = match lookup {
        Some(path) => {
            let binding = config
                .get_nonempty("lookup", "binding")
                .unwrap_or_else(|| DEFAULT_LOOKUP_BINDING.to_string());
            validate_binding("lookup", &binding)?;
            Some(LookupSource { path, binding })
        }
        None => None,
    };

    Ok(RunSettings {
        artifact,
        binding,
        layout,
        scan,
        lookup,
    })
}

fn load_lookup(source: &LookupSource) -> Option<LookupTable> {
    let port = FileArtifactAdapter::new(&source.path);
    match port
        .read()
        .and_then(|text| LookupTable::load(text, &source.binding))
    {
        Ok(table) => {
            tracing::info!(
                entries = table.len(),
                path = %source.path.display(),
                "lookup table loaded"
            );
            Some(table)
        }
        Err(e) => {
            eprintln!("warning: ignoring lookup table {}: {}", source.path.display(), e);
            None
        }
    }
}

/// Read the artifact, locate the literal and parse it. Nothing is mutated
/// unless all three steps succeed.
pub fn load_store(
    port: &dyn ArtifactPort,
    binding: &str,
) -> Result<(Artifact, Store), PendtagError> {
    let text = port.read()?;
    let artifact = Artifact::locate(text, binding)?;
    tracing::info!(
        binding,
        start = artifact.span().start,
        end = artifact.span().end,
        "literal located"
    );
    match Store::parse(artifact.literal()) {
        Ok(store) => {
            tracing::info!(instruments = store.len(), "store parsed");
            Ok((artifact, store))
        }
        Err(PendtagError::LiteralParse(mut e)) => {
            e.position += artifact.span().start;
            eprintln!("{}", e.display_with_context(artifact.text()));
            Err(PendtagError::LiteralParse(e))
        }
        Err(e) => Err(e),
    }
}

pub fn run_patch_pipeline(
    port: &dyn ArtifactPort,
    settings: &RunSettings,
    dry_run: bool,
    reporter: &dyn ReportPort,
    out: &mut dyn Write,
) -> Result<ReconcileSummary, PendtagError> {
    // Stage 1: Extract and parse
    let (artifact, mut store) = load_store(port, &settings.binding)?;

    // Stage 2: Reconcile in memory
    let summary = reconcile::reconcile(&mut store, &settings.layout);
    tracing::info!(changed = summary.changed(), "reconciled");

    // Stage 3: Single write-back
    let written = if dry_run {
        false
    } else {
        port.write(&artifact.with_literal(&store.to_literal()))?;
        true
    };

    reporter.write_patch(&summary, &port.location(), written, out)?;
    Ok(summary)
}

pub fn run_scan_pipeline(
    port: &dyn ArtifactPort,
    settings: &RunSettings,
    lookup: Option<&LookupTable>,
    reporter: &dyn ReportPort,
    out: &mut dyn Write,
) -> Result<ScanReport, PendtagError> {
    let (_, store) = load_store(port, &settings.binding)?;
    let report = scan::scan(&store, &settings.layout, &settings.scan, lookup);
    reporter.write_scan(&report, out)?;
    Ok(report)
}

pub fn run_verify_pipeline(
    port: &dyn ArtifactPort,
    settings: &RunSettings,
    reporter: &dyn ReportPort,
    out: &mut dyn Write,
) -> Result<TagListing, PendtagError> {
    let (_, store) = load_store(port, &settings.binding)?;
    let listing = verify::tagged(&store, &settings.layout);
    reporter.write_tags(&listing, out)?;
    Ok(listing)
}
