use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{console::OutputHandle, sink::LogSink};

/// The seam to an attached server instance. The core never interprets
/// commands; it only forwards them.
pub trait ServerControl {
    fn handle_command(&mut self, command: &str);

    /// Requests a stop. Not waited on; see [`ServerRegistry::shutdown_all`].
    fn stop(&mut self);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InstanceId(u64);

struct Entry {
    id: InstanceId,
    sink: LogSink,
    control: Box<dyn ServerControl>,
}

/// Ordered collection of live server instances, insertion order = attach
/// order. Constructed by the host and passed around explicitly: create at
/// process start, drain at shutdown.
#[derive(Default)]
pub struct ServerRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl ServerRegistry {
    pub fn new() -> ServerRegistry {
        ServerRegistry::default()
    }

    pub fn attach(&mut self, sink: LogSink, control: Box<dyn ServerControl>) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, sink, control });
        id
    }

    /// Removes exactly one matching entry. Safe to call after the registry
    /// has already been drained.
    pub fn detach(&mut self, id: InstanceId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn sink(&self, id: InstanceId) -> Option<&LogSink> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.sink)
    }

    /// The instance reported it has fully closed: log it and drop it.
    pub fn close(&mut self, id: InstanceId) {
        if let Some(entry) = self.entries.iter().find(|e| e.id == id) {
            entry.sink.info("Server is closed.");
        }
        self.detach(id);
    }

    /// Routes one completed input line to the first attached instance.
    /// Commands are deliberately not broadcast: with several instances in one
    /// process, a typed command reaches exactly one handler.
    pub fn dispatch_line(&mut self, line: &str) -> bool {
        match self.entries.first_mut() {
            Some(entry) => {
                entry.control.handle_command(line);
                true
            }
            None => false,
        }
    }

    /// Best-effort shutdown at process exit: logs and requests a stop from
    /// every live instance in attach order, without waiting for any stop to
    /// complete. In-flight stops may be abandoned when the process exits.
    pub fn shutdown_all(&mut self) {
        for mut entry in self.entries.drain(..) {
            entry.sink.log("Server shutting down...");
            entry.control.stop();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-exit flag backed by the ctrl-c handler. The host polls
/// [`ShutdownSignal::triggered`] from its loop and calls
/// [`ServerRegistry::shutdown_all`] once it flips.
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Installs the process-exit handler. Can only be done once per process.
    /// The handler echoes past the `^C` through the given output handle so
    /// the prompt line stays intact.
    pub fn install(output: OutputHandle) -> anyhow::Result<ShutdownSignal> {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || handle_exit_signal(&output, &handler_flag))?;
        Ok(ShutdownSignal { flag })
    }

    pub fn triggered(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// Runs on the signal thread, so the echo goes through the multiplexer like
// every other write instead of straight to stdout
pub(crate) fn handle_exit_signal(output: &OutputHandle, flag: &AtomicBool) {
    output.print_line("");
    flag.store(true, Ordering::Relaxed);
}
