//! Script host: owns the engine, the loaded program and the clock.
//!
//! A program is any script that evaluates to an object map. Lifecycle
//! callbacks are function pointers stored in that map; they are called with
//! the map bound to `this` and the [`Io`] capability object as argument:
//!
//! ```rhai
//! let jam = #{ count: 0 };
//!
//! jam.init = |io| {
//!     print("ready at " + io.tpb + " tpb");
//! };
//!
//! jam.tick = |io| {
//!     if io.on(1.0) {
//!         io.playNote(60, 100, io.dur(1, 2));
//!         this.count += 1;
//!     }
//! };
//!
//! jam.onMessage = |io, value| {
//!     io.sendCC(1, value.to_int());
//! };
//!
//! jam
//! ```
//!
//! Failures inside callbacks never escape: they are logged, reported on the
//! diagnostic channel, and the tick still counts.

use crate::api::{create_engine, Io};
use crate::config::{Features, JamConfig};
use crate::error::{Error, Result};
use crate::events::{Atom, Diagnostic};
use crate::loader::{FileLoader, ScriptLoader, ScriptSource};
use crate::messages::HostMessage;
use crate::sink::EventSink;
use crate::timing::ClockState;
use rhai::{CallFnOptions, Dynamic, Engine, FnPtr, Map, Scope, AST};
use std::sync::Arc;

/// Name of the callback run once after a successful load.
pub const INIT_CALLBACK: &str = "init";
/// Name of the callback run on every tick.
pub const TICK_CALLBACK: &str = "tick";
/// Name of the callback run for inbound messages.
pub const MESSAGE_CALLBACK: &str = "onMessage";

/// A loaded program: the compiled script and the map it evaluated to.
struct Program {
    name: String,
    ast: AST,
    table: Dynamic,
}

/// Owns one Rhai engine and drives one program from host ticks.
///
/// Every entry point takes `&mut self`; hosts that deliver ticks from several
/// threads should go through [`Scheduler`](crate::runtime::Scheduler).
pub struct ScriptHost {
    engine: Engine,
    loader: Box<dyn ScriptLoader>,
    sink: Arc<dyn EventSink>,
    clock: ClockState,
    features: Features,
    io: Io,
    program: Option<Program>,
}

impl ScriptHost {
    /// Create a host with an explicit loader and sink.
    pub fn new(
        config: &JamConfig,
        loader: Box<dyn ScriptLoader>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let clock = ClockState::new(config.ticks_per_beat, config.beats_per_minute)
            .with_channel_default(config.channel_default);
        let engine = create_engine(config, sink.clone());
        let io = Io::new(&clock, sink.clone());

        log::info!(
            "jam: created with tpb={} bpm={}",
            clock.ticks_per_beat(),
            clock.beats_per_minute()
        );

        Ok(Self {
            engine,
            loader,
            sink,
            clock,
            features: config.features,
            io,
            program: None,
        })
    }

    /// Create a host that loads scripts from the configured search paths.
    pub fn with_file_loader(config: &JamConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let loader = FileLoader::new(config.search_paths.clone(), config.script_extension.clone());
        Self::new(config, Box::new(loader), sink)
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    /// The capability object handed to callbacks.
    pub fn io(&self) -> &Io {
        &self.io
    }

    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    /// Name of the loaded program's source.
    pub fn program_name(&self) -> Option<&str> {
        self.program.as_ref().map(|p| p.name.as_str())
    }

    /// Copy of the loaded program's map, including state the script stored on `this`.
    pub fn program_table(&self) -> Option<Map> {
        self.program
            .as_ref()
            .and_then(|p| p.table.read_lock::<Map>().map(|map| (*map).clone()))
    }

    /// Load a program through the configured loader.
    ///
    /// On a load or contract failure the previous program stays in place.
    /// A failing `init` is reported and returned, but the new program stays
    /// loaded with whatever state `init` left behind.
    pub fn load(&mut self, identifier: &str) -> Result<()> {
        let result = self
            .loader
            .load(identifier)
            .and_then(|source| self.install(identifier, source));
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    /// Load a program from source text, bypassing the loader.
    pub fn load_source(&mut self, source: ScriptSource) -> Result<()> {
        let identifier = source.name.clone();
        let result = self.install(&identifier, source);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn install(&mut self, identifier: &str, source: ScriptSource) -> Result<()> {
        let load_error = |message: String| Error::Load {
            identifier: identifier.to_string(),
            message,
        };

        let mut ast = self
            .engine
            .compile(&source.text)
            .map_err(|e| load_error(e.to_string()))?;
        ast.set_source(source.name.as_str());

        let table = self
            .engine
            .eval_ast::<Dynamic>(&ast)
            .map_err(|e| load_error(e.to_string()))?;

        if !table.is_map() {
            return Err(Error::ContractViolation {
                identifier: identifier.to_string(),
                found: table.type_name().to_string(),
            });
        }

        self.program = Some(Program {
            name: source.name,
            ast,
            table,
        });
        self.io = Io::new(&self.clock, self.sink.clone());

        self.invoke(INIT_CALLBACK, Vec::new()).map_err(Error::Init)?;

        self.sink.diagnostic(Diagnostic::info("loaded"));
        log::info!("jam: loaded {}", identifier);
        Ok(())
    }

    /// Process one tick: refresh `io`, run `tick`, advance the clock.
    pub fn tick(&mut self) {
        self.io.refresh(&self.clock);

        if let Err(message) = self.invoke(TICK_CALLBACK, Vec::new()) {
            self.report(&Error::Callback {
                callback: TICK_CALLBACK,
                message,
            });
        }

        self.clock.advance();
    }

    /// Forward inbound values to `onMessage`. Does not advance the clock.
    pub fn dispatch_message(&mut self, values: &[Atom]) {
        if values.is_empty() {
            return;
        }
        if !self.features.enable_messages {
            log::debug!("jam: message dispatch disabled, dropping {} values", values.len());
            return;
        }

        self.io.refresh(&self.clock);

        let args = values.iter().map(Atom::to_dynamic).collect();
        if let Err(message) = self.invoke(MESSAGE_CALLBACK, args) {
            self.report(&Error::Callback {
                callback: MESSAGE_CALLBACK,
                message,
            });
        }
    }

    /// Rewind the tick counter. The program and its state are untouched.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.io.refresh(&self.clock);
        self.sink.diagnostic(Diagnostic::info("reset"));
        log::info!("jam: reset counters");
    }

    /// Returns whether the value was applied.
    pub fn set_ticks_per_beat(&mut self, value: f64) -> bool {
        if self.clock.set_ticks_per_beat(value) {
            self.io.set_ticks_per_beat(value);
            log::info!("jam: tpb set to {}", value);
            true
        } else {
            log::warn!("jam: ignoring ticks per beat {}", value);
            false
        }
    }

    /// Returns whether the value was applied.
    pub fn set_beats_per_minute(&mut self, value: f64) -> bool {
        if self.clock.set_beats_per_minute(value) {
            self.io.set_beats_per_minute(value);
            log::info!("jam: bpm set to {}", value);
            true
        } else {
            log::warn!("jam: ignoring beats per minute {}", value);
            false
        }
    }

    /// Apply one inbound host message.
    pub fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::Tick => self.tick(),
            HostMessage::Message(values) => self.dispatch_message(&values),
            HostMessage::Load(identifier) => {
                // Already reported on the diagnostic channel.
                let _ = self.load(&identifier);
            }
            HostMessage::Reset => self.reset(),
            HostMessage::SetTicksPerBeat(value) => {
                self.set_ticks_per_beat(value);
            }
            HostMessage::SetBeatsPerMinute(value) => {
                self.set_beats_per_minute(value);
            }
            HostMessage::Shutdown => log::debug!("jam: shutdown is handled by the scheduler thread"),
        }
    }

    /// Call a lifecycle callback with `this` bound to the program map.
    ///
    /// Returns `Ok(false)` when there is no program or the map has no
    /// callable entry under `name`, and the script error text on failure.
    fn invoke(&mut self, name: &str, extra: Vec<Dynamic>) -> std::result::Result<bool, String> {
        let Some(program) = self.program.as_mut() else {
            return Ok(false);
        };

        let entry = program
            .table
            .read_lock::<Map>()
            .and_then(|map| map.get(name).cloned());
        let fn_ptr = match entry.map(|value| value.try_cast::<FnPtr>()) {
            Some(Some(fn_ptr)) => fn_ptr,
            Some(None) => {
                log::debug!("jam: {}.{} is not a function, skipping", program.name, name);
                return Ok(false);
            }
            None => return Ok(false),
        };

        // Callbacks take `io` plus the values positionally: extra values are
        // dropped and missing ones arrive as `()`.
        let mut values = Vec::with_capacity(extra.len() + 1);
        values.push(Dynamic::from(self.io.clone()));
        values.extend(extra);
        if let Some(arity) = script_arity(&program.ast, fn_ptr.fn_name(), fn_ptr.curry().len()) {
            values.resize(arity, Dynamic::UNIT);
        }

        // Closures carry their captured variables as leading curried arguments.
        let mut args: Vec<Dynamic> = fn_ptr.curry().to_vec();
        args.extend(values);

        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut program.table);

        self.engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut Scope::new(),
                &program.ast,
                fn_ptr.fn_name(),
                args,
            )
            .map(|_| true)
            .map_err(|e| e.to_string())
    }

    fn report(&self, err: &Error) {
        log::error!("jam: [{}] {}", err.operation(), err);
        self.sink.diagnostic(Diagnostic::error(err.to_string()));
    }
}

/// Number of non-curried parameters of the script function `name`.
///
/// `None` when the AST has no such function. With several overloads the one
/// with the most parameters wins.
fn script_arity(ast: &AST, name: &str, curried: usize) -> Option<usize> {
    ast.iter_functions()
        .filter(|f| f.name == name)
        .map(|f| f.params.len())
        .max()
        .map(|params| params.saturating_sub(curried))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MusicalEvent;
    use crate::loader::MemoryLoader;
    use crate::sink::MemorySink;

    const FOUR_NOTES: &str = r#"
let jam = #{ seen: [] };
jam.tick = |io| {
    this.seen.push(io.tc);
    io.playNote(60, 100, 4, 1);
};
jam
"#;

    fn host_with(
        config: JamConfig,
        scripts: &[(&str, &str)],
    ) -> (ScriptHost, Arc<MemorySink>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut loader = MemoryLoader::new();
        for (name, text) in scripts {
            loader.insert(*name, *text);
        }
        let sink = Arc::new(MemorySink::new());
        let host = ScriptHost::new(&config, Box::new(loader), sink.clone()).unwrap();
        (host, sink)
    }

    fn host(scripts: &[(&str, &str)]) -> (ScriptHost, Arc<MemorySink>) {
        let config = JamConfig {
            ticks_per_beat: 4.0,
            ..JamConfig::default()
        };
        host_with(config, scripts)
    }

    fn ints(table: &Map, key: &str) -> Vec<i64> {
        table
            .get(key)
            .unwrap()
            .clone()
            .into_array()
            .unwrap()
            .into_iter()
            .map(|v| v.as_int().unwrap())
            .collect()
    }

    fn note(note: i64, channel: i64) -> MusicalEvent {
        MusicalEvent::Note {
            note,
            velocity: 100,
            duration: 4,
            channel,
        }
    }

    #[test]
    fn test_four_ticks_emit_four_notes() {
        let (mut host, sink) = host(&[("four", FOUR_NOTES)]);
        host.load("four").unwrap();
        for _ in 0..4 {
            host.tick();
        }

        assert_eq!(sink.events(), vec![note(60, 1); 4]);
        assert_eq!(host.clock().tick_count(), 4);
        assert_eq!(ints(&host.program_table().unwrap(), "seen"), vec![0, 1, 2, 3]);
        assert_eq!(sink.diagnostics(), vec![Diagnostic::info("loaded")]);
    }

    #[test]
    fn test_tick_without_program_still_counts() {
        let (mut host, sink) = host(&[]);
        assert!(!host.is_loaded());
        host.tick();
        host.tick();
        assert_eq!(host.clock().tick_count(), 2);
        assert!(sink.events().is_empty());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_program_without_tick_callback() {
        let (mut host, sink) = host(&[("empty", "#{ name: \"idle\" }")]);
        host.load("empty").unwrap();
        host.tick();
        assert_eq!(host.clock().tick_count(), 1);
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn test_non_function_callback_is_skipped() {
        let (mut host, sink) = host(&[("odd", "#{ tick: 42 }")]);
        host.load("odd").unwrap();
        host.tick();
        assert_eq!(host.clock().tick_count(), 1);
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn test_quantized_notes_fixture() {
        let script = r#"
let jam = #{};
jam.tick = |io| {
    if io.on(2.0, 0.5) {
        io.playNote(io.tc, 100, 4);
    }
};
jam
"#;
        let (mut host, sink) = host(&[("offbeat", script)]);
        host.load("offbeat").unwrap();
        for _ in 0..20 {
            host.tick();
        }
        assert_eq!(sink.events(), vec![note(2, 1), note(10, 1), note(18, 1)]);
    }

    #[test]
    fn test_this_state_persists_between_calls() {
        let script = r#"
let jam = #{ count: 0, started: false };
jam.init = |io| { this.started = true; this.count = io.tc; };
jam.tick = |io| { this.count += 1; };
jam
"#;
        let (mut host, _) = host(&[("counter", script)]);
        host.load("counter").unwrap();
        for _ in 0..3 {
            host.tick();
        }
        let table = host.program_table().unwrap();
        assert_eq!(table.get("count").unwrap().as_int().unwrap(), 3);
        assert!(table.get("started").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_closures_and_named_functions() {
        let script = r#"
fn accent(io) {
    io.playNote(this.root + 12, 100, 4, 2);
}
let base = 48;
let jam = #{ root: 36 };
jam.init = Fn("accent");
jam.tick = |io| io.playNote(base, 100, 4);
jam
"#;
        let (mut host, sink) = host(&[("mixed", script)]);
        host.load("mixed").unwrap();
        host.tick();
        assert_eq!(sink.events(), vec![note(48, 2), note(48, 1)]);
    }

    #[test]
    fn test_malformed_load_keeps_previous_program() {
        let (mut host, sink) = host(&[
            ("four", FOUR_NOTES),
            ("broken", "let jam = #{ tick: |io| { "),
            ("not_a_map", "42"),
            ("raises", "throw \"nope\";"),
        ]);
        host.load("four").unwrap();

        assert!(matches!(host.load("broken"), Err(Error::Load { .. })));
        assert!(matches!(host.load("raises"), Err(Error::Load { .. })));
        match host.load("not_a_map") {
            Err(Error::ContractViolation { found, .. }) => assert_eq!(found, "i64"),
            other => panic!("Expected ContractViolation, got {:?}", other),
        }
        assert!(matches!(host.load("missing"), Err(Error::Load { .. })));

        host.tick();
        assert_eq!(sink.events(), vec![note(60, 1)]);
        assert_eq!(host.program_name(), Some("four"));
        assert_eq!(sink.errors().len(), 4);
    }

    #[test]
    fn test_init_failure_keeps_program_loaded() {
        // A failing init does not roll the load back: the new program
        // replaces the old one with whatever state init left behind.
        let script = r#"
let jam = #{ step: 0 };
jam.init = |io| {
    this.step = 1;
    throw "init exploded";
};
jam.tick = |io| { io.playNote(this.step, 100, 4); };
jam
"#;
        let (mut host, sink) = host(&[("four", FOUR_NOTES), ("half", script)]);
        host.load("four").unwrap();
        sink.clear();

        match host.load("half") {
            Err(Error::Init(message)) => assert!(message.contains("init exploded")),
            other => panic!("Expected Init error, got {:?}", other),
        }
        assert_eq!(host.program_name(), Some("half"));
        assert!(!sink.diagnostics().contains(&Diagnostic::info("loaded")));
        assert_eq!(sink.errors().len(), 1);

        host.tick();
        assert_eq!(sink.events(), vec![note(1, 1)]);
    }

    #[test]
    fn test_tick_failure_is_reported_and_counted() {
        let script = r#"
let jam = #{};
jam.tick = |io| {
    if io.tc == 1 { throw "bad tick"; }
    io.playNote(60, 100, 4);
};
jam
"#;
        let (mut host, sink) = host(&[("flaky", script)]);
        host.load("flaky").unwrap();
        for _ in 0..3 {
            host.tick();
        }

        assert_eq!(host.clock().tick_count(), 3);
        assert_eq!(sink.events().len(), 2);
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("error in tick(): "));
        assert!(errors[0].contains("bad tick"));
        assert!(host.is_loaded());
    }

    #[test]
    fn test_argument_error_inside_tick() {
        let script = "let jam = #{}; jam.tick = |io| io.playNote(60); jam";
        let (mut host, sink) = host(&[("short", script)]);
        host.load("short").unwrap();
        host.tick();
        assert!(sink.events().is_empty());
        assert!(sink.errors()[0].contains("bad argument #2 to 'playNote'"));
        assert_eq!(host.clock().tick_count(), 1);
    }

    #[test]
    fn test_division_by_zero_inside_tick() {
        let script = "let jam = #{}; jam.tick = |io| io.playNote(60, 100, io.dur(1, 0)); jam";
        let (mut host, sink) = host(&[("zero", script)]);
        host.load("zero").unwrap();
        host.tick();
        host.tick();
        assert_eq!(sink.errors().len(), 2);
        assert!(sink.errors()[0].contains("division by zero"));
        assert_eq!(host.clock().tick_count(), 2);
    }

    #[test]
    fn test_dispatch_message() {
        let script = r#"
let jam = #{ got: [] };
jam.onMessage = |io, a, b| {
    this.got = [io.tc, a, b];
    io.sendCC(1, a.to_int(), 3);
};
jam
"#;
        let (mut host, sink) = host(&[("listener", script)]);
        host.load("listener").unwrap();
        host.tick();
        host.dispatch_message(&[Atom::Float(64.0), Atom::symbol("go")]);

        assert_eq!(host.clock().tick_count(), 1);
        let got = host
            .program_table()
            .unwrap()
            .get("got")
            .unwrap()
            .clone()
            .into_array()
            .unwrap();
        assert_eq!(got[0].as_int().unwrap(), 1);
        assert_eq!(got[1].as_float().unwrap(), 64.0);
        assert_eq!(got[2].clone().into_string().unwrap(), "go");
        assert_eq!(
            sink.events(),
            vec![MusicalEvent::ControlChange {
                controller: 1,
                value: 64,
                channel: 3
            }]
        );
    }

    #[test]
    fn test_message_values_are_positional() {
        let script = r#"
let jam = #{ first: (), second: "unset" };
jam.onMessage = |io, a| { this.first = a; };
jam
"#;
        let (mut single, sink) = host(&[("one", script)]);
        single.load("one").unwrap();
        single.dispatch_message(&[Atom::Float(60.0), Atom::Float(100.0)]);
        assert!(sink.errors().is_empty(), "{:?}", sink.errors());
        let table = single.program_table().unwrap();
        assert_eq!(table.get("first").unwrap().as_float().unwrap(), 60.0);

        let script = r#"
let jam = #{ got: [] };
jam.onMessage = |io, a, b, c| { this.got = [a, b, c]; };
jam
"#;
        let (mut triple, sink) = host(&[("three", script)]);
        triple.load("three").unwrap();
        triple.dispatch_message(&[Atom::symbol("go")]);
        assert!(sink.errors().is_empty(), "{:?}", sink.errors());
        let got = triple
            .program_table()
            .unwrap()
            .get("got")
            .unwrap()
            .clone()
            .into_array()
            .unwrap();
        assert_eq!(got[0].clone().into_string().unwrap(), "go");
        assert!(got[1].is_unit());
        assert!(got[2].is_unit());
    }

    #[test]
    fn test_callbacks_without_io_parameter() {
        let script = r#"
let base = 7;
let jam = #{ ready: false, ticks: 0 };
jam.init = || { this.ready = true; };
jam.tick = || { this.ticks += base; };
jam
"#;
        let (mut host, sink) = host(&[("bare", script)]);
        host.load("bare").unwrap();
        host.tick();
        host.tick();
        assert!(sink.errors().is_empty(), "{:?}", sink.errors());
        let table = host.program_table().unwrap();
        assert!(table.get("ready").unwrap().as_bool().unwrap());
        assert_eq!(table.get("ticks").unwrap().as_int().unwrap(), 14);
    }

    #[test]
    fn test_empty_message_is_a_no_op() {
        let script = "let jam = #{}; jam.onMessage = |io| { throw \"called\"; }; jam";
        let (mut host, sink) = host(&[("listener", script)]);
        host.load("listener").unwrap();
        sink.clear();

        host.dispatch_message(&[]);
        assert!(sink.events().is_empty());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_message_failure_is_reported() {
        let script = "let jam = #{}; jam.onMessage = |io, x| { throw \"bad message\"; }; jam";
        let (mut host, sink) = host(&[("listener", script)]);
        host.load("listener").unwrap();
        host.dispatch_message(&[Atom::Float(1.0)]);
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("error in onMessage(): "));
    }

    #[test]
    fn test_messages_disabled_in_minimal_variant() {
        let script = "let jam = #{ hit: false }; jam.onMessage = |io, x| { this.hit = true; }; jam";
        let config = JamConfig {
            features: Features::minimal(),
            ..JamConfig::default()
        };
        let (mut host, sink) = host_with(config, &[("listener", script)]);
        host.load("listener").unwrap();
        host.dispatch_message(&[Atom::Float(1.0)]);
        let table = host.program_table().unwrap();
        assert!(!table.get("hit").unwrap().as_bool().unwrap());
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (mut host, sink) = host(&[("four", FOUR_NOTES)]);
        host.load("four").unwrap();
        host.tick();
        host.tick();
        sink.clear();

        host.reset();
        assert_eq!(host.clock().tick_count(), 0);
        host.reset();
        assert_eq!(host.clock().tick_count(), 0);
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::info("reset"), Diagnostic::info("reset")]
        );
        assert!(sink.events().is_empty());

        host.tick();
        let seen = ints(&host.program_table().unwrap(), "seen");
        assert_eq!(seen, vec![0, 1, 0]);
    }

    #[test]
    fn test_setters_reach_running_script() {
        let script = r#"
let jam = #{ tpbs: [], bpms: [] };
jam.tick = |io| {
    this.tpbs.push(io.tpb.to_int());
    this.bpms.push(io.bpm.to_int());
};
jam
"#;
        let (mut host, _) = host(&[("watch", script)]);
        host.load("watch").unwrap();
        host.tick();
        assert!(host.set_ticks_per_beat(8.0));
        assert!(host.set_beats_per_minute(140.0));
        host.tick();
        assert!(!host.set_ticks_per_beat(0.0));
        assert!(!host.set_beats_per_minute(-5.0));
        host.tick();

        let table = host.program_table().unwrap();
        assert_eq!(ints(&table, "tpbs"), vec![4, 8, 8]);
        assert_eq!(ints(&table, "bpms"), vec![100, 140, 140]);
        assert_eq!(host.io().snapshot().ticks_per_beat(), 8.0);
    }

    #[test]
    fn test_init_sees_current_clock() {
        let script = "let jam = #{}; jam.init = |io| { this.at = io.tc; }; jam";
        let (mut host, _) = host(&[("late", script)]);
        for _ in 0..5 {
            host.tick();
        }
        host.load("late").unwrap();
        let table = host.program_table().unwrap();
        assert_eq!(table.get("at").unwrap().as_int().unwrap(), 5);
    }

    #[test]
    fn test_print_capture() {
        let script = r#"
let jam = #{};
jam.tick = |io| { print("tick", io.tc); };
jam
"#;
        let (mut host, sink) = host(&[("chatty", script)]);
        host.load("chatty").unwrap();
        host.tick();
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::info("loaded"), Diagnostic::info("tick\t0")]
        );
    }

    #[test]
    fn test_beat_counters() {
        let script = r#"
let jam = #{ beats: [], ticks: [] };
jam.tick = |io| {
    this.beats.push(io.beat_count);
    this.ticks.push(io.tick_count);
};
jam
"#;
        let (mut host, _) = host(&[("counters", script)]);
        host.load("counters").unwrap();
        for _ in 0..6 {
            host.tick();
        }
        let table = host.program_table().unwrap();
        assert_eq!(ints(&table, "beats"), vec![0, 0, 0, 0, 1, 1]);
        assert_eq!(ints(&table, "ticks"), vec![0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn test_handle_messages() {
        let (mut host, sink) = host(&[("four", FOUR_NOTES)]);
        host.handle(HostMessage::Load("four".to_string()));
        host.handle(HostMessage::Tick);
        host.handle(HostMessage::SetTicksPerBeat(12.0));
        host.handle(HostMessage::Reset);
        host.handle(HostMessage::Tick);
        host.handle(HostMessage::Load("missing".to_string()));

        assert_eq!(host.clock().tick_count(), 1);
        assert_eq!(host.clock().ticks_per_beat(), 12.0);
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.errors().len(), 1);
    }

    #[test]
    fn test_load_source_directly() {
        let (mut host, sink) = host(&[]);
        host.load_source(ScriptSource {
            name: "inline".to_string(),
            text: FOUR_NOTES.to_string(),
        })
        .unwrap();
        host.tick();
        assert_eq!(sink.events().len(), 1);
        assert_eq!(host.program_name(), Some("inline"));
    }
}
