use std::{
    fmt,
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use chrono::{DateTime, Local};
use crossterm::style::Stylize;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    oneshot,
};

use crate::{console::OutputHandle, settings::Settings};

pub const TIME_FORMAT: &str = "%B %-d, %Y, %H:%M:%S";
pub const LOG_HEADER: &str = "[INFO]: Started logging...\n";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn colored_tag(self) -> String {
        match self {
            Level::Info => "INFO".green().to_string(),
            Level::Warn => "WARN".yellow().to_string(),
            Level::Error => "ERROR".red().to_string(),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Per-instance transform applied to every rendered line. Returning `None`
/// (or an empty string) drops the message entirely.
pub type MessageHook = Box<dyn Fn(&str) -> Option<String> + Send>;

type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Log sink for one attached server instance. Cheap to clone; clones share
/// the hook and the file worker.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    settings: Arc<Settings>,
    output: OutputHandle,
    file: Option<FileWorker>,
    hook: Mutex<Option<MessageHook>>,
    clock: Clock,
}

impl LogSink {
    pub fn new(settings: Arc<Settings>, output: OutputHandle, log_path: PathBuf) -> LogSink {
        Self::with_clock(settings, output, log_path, Box::new(Local::now))
    }

    pub(crate) fn with_clock(
        settings: Arc<Settings>,
        output: OutputHandle,
        log_path: PathBuf,
        clock: Clock,
    ) -> LogSink {
        let file = settings
            .logging
            .then(|| FileWorker::spawn(log_path, output.clone()));
        LogSink {
            inner: Arc::new(SinkInner {
                settings,
                output,
                file,
                hook: Mutex::new(None),
                clock,
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// The per-instance debug flag from the settings.
    pub fn debug(&self) -> bool {
        self.inner.settings.debug
    }

    pub fn set_hook(&self, hook: MessageHook) {
        *lock(&self.inner.hook) = Some(hook);
    }

    /// Timestamps and emits one untagged line.
    pub fn log(&self, message: &str) {
        self.emit(None, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Some(Level::Info), message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Some(Level::Warn), message);
    }

    pub fn err(&self, message: &str) {
        self.emit(Some(Level::Error), message);
    }

    fn emit(&self, level: Option<Level>, message: &str) {
        let time = (self.inner.clock)().format(TIME_FORMAT);
        let plain = match level {
            Some(level) => format!("{time} [{}]: {message}", level.tag()),
            None => format!("{time} {message}"),
        };

        // The hook sees (and may replace or drop) the fully rendered line
        let hooked = match &*lock(&self.inner.hook) {
            Some(hook) => match hook(&plain) {
                Some(line) if !line.is_empty() => Some(line),
                _ => return,
            },
            None => None,
        };

        // Tags are highlighted on an interactive console only; the log file
        // always receives the plain form
        let console_line = match (&hooked, level) {
            (Some(line), _) => line.clone(),
            (None, Some(level)) if self.inner.output.is_interactive() => {
                format!("{time} [{}]: {message}", level.colored_tag())
            }
            (None, _) => plain.clone(),
        };
        let file_line = hooked.unwrap_or(plain);

        if !self.inner.settings.no_console_output {
            self.inner.output.print_line(&console_line);
        }
        if let Some(file) = &self.inner.file {
            file.append(file_line);
        }
    }

    /// Resets the log file to a fresh header, creating the log directory as
    /// needed. Truncates any previous content. No-op when file logging is
    /// disabled.
    pub fn create_log(&self) {
        if let Some(file) = &self.inner.file {
            file.create();
        }
    }

    /// Blocks until the file worker has processed everything queued so far.
    pub fn flush(&self) {
        if let Some(file) = &self.inner.file {
            file.flush();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum FileCmd {
    Create,
    Append(String),
    Flush(oneshot::Sender<()>),
}

/// Background appender for one instance's log file. Failures are reported on
/// the secondary stream and never reach the caller of `log`.
struct FileWorker {
    commands: UnboundedSender<FileCmd>,
}

impl FileWorker {
    fn spawn(path: PathBuf, output: OutputHandle) -> FileWorker {
        let (send, recv) = unbounded_channel();
        _ = thread::Builder::new()
            .name("Log Writer".to_owned())
            .spawn(move || run(path, output, recv));
        FileWorker { commands: send }
    }

    fn append(&self, line: String) {
        _ = self.commands.send(FileCmd::Append(line));
    }

    fn create(&self) {
        _ = self.commands.send(FileCmd::Create);
    }

    fn flush(&self) {
        let (ack_send, ack_recv) = oneshot::channel();
        if self.commands.send(FileCmd::Flush(ack_send)).is_ok() {
            _ = ack_recv.blocking_recv();
        }
    }
}

fn run(path: PathBuf, output: OutputHandle, mut commands: UnboundedReceiver<FileCmd>) {
    while let Some(cmd) = commands.blocking_recv() {
        match cmd {
            FileCmd::Create => {
                if let Some(parent) = path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        output.write_stray(&format!(
                            "Failed to create log directory {}: {e}",
                            parent.display()
                        ));
                        continue;
                    }
                }
                if let Err(e) = fs::write(&path, LOG_HEADER) {
                    output.write_stray(&format!(
                        "Failed to create log file {}: {e}",
                        path.display()
                    ));
                }
            }
            FileCmd::Append(line) => {
                // Open per append: two instances in one process share the
                // session path, and their workers must not clobber each other
                let opened = OpenOptions::new().create(true).append(true).open(&path);
                let result = opened.and_then(|mut file| writeln!(file, "{line}"));
                if let Err(e) = result {
                    output.write_stray(&format!(
                        "Failed to write to log file {}: {e}",
                        path.display()
                    ));
                }
            }
            FileCmd::Flush(ack) => {
                _ = ack.send(());
            }
        }
    }
}
