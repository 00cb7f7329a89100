//! Jam CLI - the `jam` command.
//!
//! A console host for jam programs. It stands in for the patcher: it owns the
//! tick clock, forwards inbound messages and prints whatever the program
//! plays.
//!
//! - `run` loads a program and ticks it a fixed number of times
//! - `repl` reads Pd-style commands (`bang`, `load`, `reset`, ...) from stdin
//! - `check` validates a program without a host
//! - `init-config` writes a default `jam.toml`

mod output;
mod transport;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, select, tick};
use jam_core::{
    validate_script, Atom, Error, EventSink, Features, FileLoader, JamConfig, LogSink, NoteFormat,
    Scheduler, ScriptHost,
};
use output::ConsoleSink;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use transport::Command;

/// Jam - tick-driven Rhai scripts
#[derive(Parser, Debug)]
#[command(name = "jam")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive Rhai jam scripts from a tick clock", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ticks per beat
    #[arg(long, global = true)]
    tpb: Option<f64>,

    /// Beats per minute
    #[arg(long, global = true)]
    bpm: Option<f64>,

    /// Emit notes without the leading `note` tag
    #[arg(long, global = true)]
    untagged: bool,

    /// Minimal variant: no onMessage, no sendCC, no print capture
    #[arg(long, global = true)]
    minimal: bool,

    /// Additional script directories
    #[arg(short = 'I', long = "import-path", global = true, value_name = "PATH")]
    import_paths: Vec<PathBuf>,

    /// Send events and diagnostics to the log instead of stdout/stderr
    #[arg(long, global = true)]
    log_output: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a program and tick it
    Run {
        /// Script name or path
        #[arg(value_name = "SCRIPT")]
        script: String,

        /// Number of ticks to deliver
        #[arg(short, long, default_value_t = 16)]
        ticks: u64,

        /// Pace ticks at the configured tempo instead of as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Message to dispatch before ticking, e.g. --message "60 go"
        #[arg(short, long = "message", value_name = "VALUES")]
        messages: Vec<String>,
    },

    /// Read host commands from stdin
    Repl {
        /// Script to load before reading commands
        #[arg(value_name = "SCRIPT")]
        script: Option<String>,

        /// Tick continuously at the configured tempo
        #[arg(long)]
        realtime: bool,
    },

    /// Validate a program without running a host
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Ticks to dry-run after init
        #[arg(short, long, default_value_t = 0)]
        ticks: u64,
    },

    /// Write a default configuration file
    InitConfig {
        #[arg(default_value = "jam.toml", value_name = "FILE")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match &args.command {
        Commands::Run {
            script,
            ticks,
            realtime,
            messages,
        } => {
            let config = build_config(&args)?;
            let sink = output_sink(&config, args.log_output);
            run_script(&config, sink, script, *ticks, *realtime, messages)
        }
        Commands::Repl { script, realtime } => {
            let config = build_config(&args)?;
            let sink = output_sink(&config, args.log_output);
            run_repl(&config, sink, script.as_deref(), *realtime)
        }
        Commands::Check { file, ticks } => check_script(&build_config(&args)?, file, *ticks),
        Commands::InitConfig { path, force } => init_config(path, *force),
        Commands::Version => {
            println!("jam {}", jam_core::VERSION);
            println!();
            println!("A tick-driven scheduler for Rhai scripts");
            Ok(())
        }
    }
}

/// Config file (if any) with command line overrides applied.
fn build_config(args: &Args) -> Result<JamConfig> {
    let mut config = match &args.config {
        Some(path) => JamConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => JamConfig::default(),
    };

    if let Some(tpb) = args.tpb {
        config.ticks_per_beat = tpb;
    }
    if let Some(bpm) = args.bpm {
        config.beats_per_minute = bpm;
    }
    if args.untagged {
        config.note_format = NoteFormat::Untagged;
    }
    if args.minimal {
        config.features = Features::minimal();
    }
    config.search_paths.extend(args.import_paths.iter().cloned());

    config.validate()?;
    Ok(config)
}

fn output_sink(config: &JamConfig, log_output: bool) -> Arc<dyn EventSink> {
    if log_output {
        Arc::new(LogSink::new(config.note_format))
    } else {
        Arc::new(ConsoleSink::stdio(config.note_format))
    }
}

fn run_script(
    config: &JamConfig,
    sink: Arc<dyn EventSink>,
    script: &str,
    ticks: u64,
    realtime: bool,
    messages: &[String],
) -> Result<()> {
    let mut host = ScriptHost::with_file_loader(config, sink)?;

    match host.load(script) {
        // A failing init leaves the program loaded; keep going.
        Ok(()) | Err(Error::Init(_)) => {}
        Err(err) => return Err(err).context("Failed to load program"),
    }

    for line in messages {
        host.dispatch_message(&Atom::parse_list(line));
    }

    if realtime {
        let interval = config.tick_interval();
        log::info!("Ticking every {:?}", interval);
        let ticker = tick(interval);
        for _ in 0..ticks {
            ticker.recv().context("Tick clock stopped")?;
            host.tick();
        }
    } else {
        for _ in 0..ticks {
            host.tick();
        }
    }

    log::info!("Processed {} ticks", host.clock().tick_count());
    Ok(())
}

fn run_repl(
    config: &JamConfig,
    sink: Arc<dyn EventSink>,
    script: Option<&str>,
    realtime: bool,
) -> Result<()> {
    let scheduler = Scheduler::spawn(
        config,
        Box::new(FileLoader::new(
            config.search_paths.clone(),
            config.script_extension.clone(),
        )),
        sink,
    )?;
    let handle = scheduler.handle();

    if let Some(script) = script {
        handle.load(script)?;
    }

    // Wall-clock ticks, stopped when stdin closes.
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let clock_thread = if realtime {
        let ticks = handle.clone();
        let interval = config.tick_interval();
        Some(thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if ticks.tick().is_err() {
                            break;
                        }
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
        }))
    } else {
        None
    };

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        match transport::parse_line(&line) {
            Ok(Command::Host(message)) => handle.send(message)?,
            Ok(Command::Quit) => break,
            Ok(Command::Empty) => {}
            Err(e) => eprintln!("jam: {:#}", e),
        }
    }

    drop(stop_tx);
    if let Some(clock_thread) = clock_thread {
        let _ = clock_thread.join();
    }

    let clock = scheduler.join()?;
    log::info!("Stopped after {} ticks", clock.tick_count());
    Ok(())
}

fn check_script(config: &JamConfig, file: &Path, ticks: u64) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file.display().to_string();

    let result = validate_script(&name, &content, config, ticks);
    for err in result.all_errors() {
        eprintln!("{}: {}", name, err);
    }

    if !result.is_ok() {
        bail!("{} has {} error(s)", name, result.all_errors().len());
    }

    println!("{}: ok", name);
    if result.callbacks.is_empty() {
        println!("  callbacks: none");
    } else {
        println!("  callbacks: {}", result.callbacks.join(", "));
    }
    if ticks > 0 {
        println!("  {} events in {} ticks", result.events_emitted, ticks);
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    JamConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let args = parse(&[
            "jam", "--tpb", "96", "--bpm", "140", "--untagged", "--minimal", "-I", "beats", "run",
            "drums",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.ticks_per_beat, 96.0);
        assert_eq!(config.beats_per_minute, 140.0);
        assert_eq!(config.note_format, NoteFormat::Untagged);
        assert_eq!(config.features, Features::minimal());
        assert_eq!(config.search_paths.last(), Some(&PathBuf::from("beats")));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = parse(&["jam", "run", "drums", "--bpm", "0"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jam.toml");
        std::fs::write(&path, "ticks_per_beat = 48.0\nbeats_per_minute = 90.0\n").unwrap();

        let args = parse(&["jam", "-c", path.to_str().unwrap(), "--bpm", "120", "version"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.ticks_per_beat, 48.0);
        assert_eq!(config.beats_per_minute, 120.0);
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jam.toml");
        init_config(&path, false).unwrap();
        assert!(init_config(&path, false).is_err());
        init_config(&path, true).unwrap();
        assert!(JamConfig::load(&path).is_ok());
    }

    #[test]
    fn test_run_script_from_search_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pulse.rhai"),
            "let jam = #{}; jam.tick = |io| { if io.on() { io.playNote(60, 100, 1); } }; jam",
        )
        .unwrap();
        let config = JamConfig {
            ticks_per_beat: 4.0,
            search_paths: vec![dir.path().to_path_buf()],
            ..JamConfig::default()
        };
        let sink = output_sink(&config, true);
        run_script(&config, sink.clone(), "pulse", 8, false, &[]).unwrap();
        assert!(run_script(&config, sink, "missing", 8, false, &[]).is_err());
    }

    #[test]
    fn test_check_script() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.rhai");
        let bad = dir.path().join("bad.rhai");
        std::fs::write(&good, "let jam = #{}; jam.tick = |io| {}; jam").unwrap();
        std::fs::write(&bad, "let jam = #{").unwrap();

        let config = JamConfig::default();
        check_script(&config, &good, 4).unwrap();
        assert!(check_script(&config, &bad, 0).is_err());
    }
}
