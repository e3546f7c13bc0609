use std::{
    env,
    io::{self, BufRead, IsTerminal, Write},
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    terminal::{Clear, ClearType},
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub const PROMPT: &str = "> ";

/// The output multiplexer. Every write in the process is routed through one
/// of these so the interactive prompt can be repositioned around it.
pub struct Output {
    primary: Box<dyn Write + Send>,
    secondary: Box<dyn Write + Send>,
    interactive: bool,
}

impl Output {
    pub fn new(
        primary: Box<dyn Write + Send>,
        secondary: Box<dyn Write + Send>,
        interactive: bool,
    ) -> Output {
        Output { primary, secondary, interactive }
    }

    /// Repositions the cursor to column 0 so the next printed line
    /// overwrites any partially typed prompt content instead of appending
    /// after it.
    pub fn before_print(&mut self) {
        if self.interactive {
            _ = queue!(self.primary, MoveToColumn(0), Clear(ClearType::UntilNewLine));
        }
    }

    /// Coordinated print: reposition, print, redraw, strictly in sequence.
    pub fn print_line(&mut self, text: &str) {
        self.before_print();
        _ = writeln!(self.primary, "{text}");
        if self.interactive {
            self.redraw_prompt();
        }
        _ = self.primary.flush();
    }

    /// Uncoordinated write. While the prompt is active these go to the
    /// secondary stream instead, so they can never leave the prompt line
    /// corrupted.
    pub fn write_stray(&mut self, text: &str) {
        if self.interactive {
            _ = writeln!(self.secondary, "{text}");
            _ = self.secondary.flush();
            self.redraw_prompt();
            _ = self.primary.flush();
        } else {
            _ = writeln!(self.primary, "{text}");
            _ = self.primary.flush();
        }
    }

    pub fn redraw_prompt(&mut self) {
        if !self.interactive {
            return;
        }
        _ = queue!(self.primary, MoveToColumn(0), Clear(ClearType::UntilNewLine));
        _ = write!(self.primary, "{PROMPT}");
        _ = self.primary.flush();
    }
}

/// Cheap clone handle to the shared multiplexer, held by every sink and by
/// the file writer threads.
#[derive(Clone)]
pub struct OutputHandle {
    inner: Arc<Mutex<Output>>,
    interactive: bool,
}

impl OutputHandle {
    pub fn new(output: Output) -> OutputHandle {
        let interactive = output.interactive;
        OutputHandle { inner: Arc::new(Mutex::new(output)), interactive }
    }

    pub fn print_line(&self, text: &str) {
        self.lock().print_line(text);
    }

    pub fn write_stray(&self, text: &str) {
        self.lock().write_stray(text);
    }

    pub fn redraw_prompt(&self) {
        self.lock().redraw_prompt();
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn lock(&self) -> MutexGuard<'_, Output> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the single interactive prompt and the stdin reader. One per process,
/// shared by all attached instances.
pub struct Console {
    output: OutputHandle,
    session: i64,
    lines: Option<UnboundedReceiver<String>>,
}

impl Console {
    /// Production constructor. Interactive only on a real terminal outside
    /// CI; everywhere else printing degrades to plain sequential output with
    /// no prompt management.
    pub fn start() -> Console {
        let interactive = io::stdout().is_terminal() && env::var_os("CI").is_none();
        let output = OutputHandle::new(Output::new(
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            interactive,
        ));

        let mut console = Console {
            output,
            session: chrono::Utc::now().timestamp(),
            lines: None,
        };

        if interactive {
            console.output.redraw_prompt();
            console.lines = spawn_input_thread();
        }
        console
    }

    /// Constructor with explicit streams and session stamp, for embedding
    /// and tests. Spawns no input thread.
    pub fn with_streams(
        primary: Box<dyn Write + Send>,
        secondary: Box<dyn Write + Send>,
        interactive: bool,
        session: i64,
    ) -> Console {
        Console {
            output: OutputHandle::new(Output::new(primary, secondary, interactive)),
            session,
            lines: None,
        }
    }

    pub fn handle(&self) -> OutputHandle {
        self.output.clone()
    }

    pub fn session(&self) -> i64 {
        self.session
    }

    /// One file per process start, shared by every instance attached within
    /// this process.
    pub fn log_path(&self) -> PathBuf {
        PathBuf::from("logs").join(format!("{}.log", self.session))
    }

    pub fn poll_line(&mut self) -> Option<String> {
        self.lines.as_mut()?.try_recv().ok()
    }

    #[cfg(test)]
    pub(crate) fn set_line_source(&mut self, lines: UnboundedReceiver<String>) {
        self.lines = Some(lines);
    }

    pub fn redraw_prompt(&self) {
        self.output.redraw_prompt();
    }
}

fn spawn_input_thread() -> Option<UnboundedReceiver<String>> {
    let (send, recv) = unbounded_channel();
    let spawned = thread::Builder::new()
        .name("Console Input".to_owned())
        .spawn(move || read_lines(send));

    // Degrade to a promptless console if the thread can't be spawned
    match spawned {
        Ok(_) => Some(recv),
        Err(_) => None,
    }
}

fn read_lines(send: UnboundedSender<String>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if send.send(line).is_err() {
            break;
        }
    }
}
