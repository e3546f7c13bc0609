//! Console and log coordination for long-running server processes: routes
//! per-instance log output to the console and a per-run log file, keeps the
//! interactive command prompt intact while output scrolls past it, and tracks
//! live instances so a process-exit signal shuts them all down.

pub mod console;
pub mod events;
pub mod registry;
pub mod settings;
pub mod sink;


use std::sync::Arc;

pub use console::{Console, Output, OutputHandle, PROMPT};
pub use events::{log_client_event, log_server_event, ClientEvent, ServerEvent};
pub use registry::{InstanceId, ServerControl, ServerRegistry, ShutdownSignal};
pub use settings::Settings;
pub use sink::{Level, LogSink, MessageHook};

/// Builds a sink on the console's shared log file and registers the instance.
/// Returns the id for detach/close and a sink for the host to log through and
/// bind events to.
pub fn attach_server(
    registry: &mut ServerRegistry,
    console: &Console,
    settings: Arc<Settings>,
    control: Box<dyn ServerControl>,
) -> (InstanceId, LogSink) {
    let sink = LogSink::new(settings, console.handle(), console.log_path());
    let id = registry.attach(sink.clone(), control);
    (id, sink)
}

/// Drains completed input lines into the registry and keeps the prompt on
/// screen. Call once per host tick.
pub fn pump_console(console: &mut Console, registry: &mut ServerRegistry) {
    while let Some(line) = console.poll_line() {
        registry.dispatch_line(&line);
        console.redraw_prompt();
    }
}
