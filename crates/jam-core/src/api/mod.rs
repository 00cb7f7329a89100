//! Rhai API for jam scripts.
//!
//! Each [`ScriptHost`](crate::host::ScriptHost) owns exactly one engine built
//! by [`create_engine`]. Everything a script can reach is registered here:
//!
//! - the `Io` capability object ([`io`])
//! - `print`, routed to the diagnostic channel when capture is enabled
//! - `debug`, routed to the log
//! - `import`, resolved against the configured search paths

pub mod io;

pub use io::Io;

use crate::config::JamConfig;
use crate::events::Diagnostic;
use crate::sink::EventSink;
use rhai::module_resolvers::{FileModuleResolver, ModuleResolversCollection};
use rhai::{Dynamic, Engine};
use std::sync::Arc;

/// Join `print` arguments the way scripts expect: text forms separated by tabs.
pub fn join_print_args(args: &[Dynamic]) -> String {
    args.iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join("\t")
}

/// Most values a single `print` call accepts.
pub const MAX_PRINT_ARGS: usize = 16;

/// Registers one `print` overload per arity, from the full identifier list
/// down to two arguments.
macro_rules! register_print {
    (@one $engine:expr; $($arg:ident),+) => {
        $engine.register_fn("print", |$($arg: Dynamic),+| join_print_args(&[$($arg),+]));
    };
    ($engine:expr; $first:ident, $second:ident $(, $rest:ident)*) => {
        register_print!(@one $engine; $first, $second $(, $rest)*);
        register_print!($engine; $second $(, $rest)*);
    };
    ($engine:expr; $last:ident) => {};
}

/// Multi-argument `print`. Rhai routes any native `print` result through the
/// engine's print hook, so these only build the text.
fn register_print(engine: &mut Engine) {
    register_print!(engine; a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p);
}

/// Create a Rhai engine with the jam API registered.
pub fn create_engine(config: &JamConfig, sink: Arc<dyn EventSink>) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
    engine.set_max_call_levels(config.max_call_levels);

    register_print(&mut engine);
    if config.features.enable_print_capture {
        // Scripts must never write anywhere but the diagnostic channel.
        engine.on_print(move |text| sink.diagnostic(Diagnostic::info(text)));
    } else {
        engine.on_print(|text| {
            log::info!("[script] {}", text);
        });
    }

    engine.on_debug(|text, source, pos| {
        let loc = match (source, pos) {
            (Some(src), pos) if !pos.is_none() => format!(" ({}:{})", src, pos),
            (Some(src), _) => format!(" ({})", src),
            (None, pos) if !pos.is_none() => format!(" ({})", pos),
            _ => String::new(),
        };
        log::debug!("[script]{} {}", loc, text);
    });

    io::register(&mut engine, config.features);

    // Source-relative imports first, then each search path in order.
    let mut collection = ModuleResolversCollection::new();
    let mut source_resolver = FileModuleResolver::new();
    source_resolver.set_extension(config.script_extension.clone());
    collection.push(source_resolver);
    for path in &config.search_paths {
        let mut resolver = FileModuleResolver::new();
        resolver.set_base_path(path.clone());
        resolver.set_extension(config.script_extension.clone());
        collection.push(resolver);
    }
    engine.set_module_resolver(collection);

    engine
}
