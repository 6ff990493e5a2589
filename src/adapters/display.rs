use crate::domain::model::{ConnectionState, DisplayTarget};
use crate::domain::ports::CountDisplay;
use chrono::Local;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Last values written to each target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplayState {
    pub in_count: Option<u64>,
    pub out_count: Option<u64>,
    pub present_count: Option<u64>,
    pub connection: Option<ConnectionState>,
}

impl DisplayState {
    pub fn count(&self, target: DisplayTarget) -> Option<u64> {
        match target {
            DisplayTarget::InCount => self.in_count,
            DisplayTarget::OutCount => self.out_count,
            DisplayTarget::PresentCount => self.present_count,
        }
    }

    fn set_count(&mut self, target: DisplayTarget, value: u64) {
        let slot = match target {
            DisplayTarget::InCount => &mut self.in_count,
            DisplayTarget::OutCount => &mut self.out_count,
            DisplayTarget::PresentCount => &mut self.present_count,
        };
        *slot = Some(value);
    }

    pub fn opacity(&self) -> f32 {
        self.connection.map_or(1.0, |c| c.opacity())
    }

    /// One-line summary, e.g. `IN: 10 | OUT: 3 | PRESENT: 7 | connected`.
    pub fn render_line(&self) -> String {
        let fields: Vec<String> = DisplayTarget::ALL
            .iter()
            .map(|target| match self.count(*target) {
                Some(value) => format!("{}: {}", target.label(), value),
                None => format!("{}: -", target.label()),
            })
            .collect();

        let connection = match self.connection {
            None => "waiting".to_string(),
            Some(ConnectionState::Connected) => "connected".to_string(),
            Some(ConnectionState::Disconnected { opacity }) => {
                format!("disconnected (opacity {:.1})", opacity)
            }
        };

        format!("{} | {}", fields.join(" | "), connection)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: DisplayState,
    writes: Vec<(DisplayTarget, u64)>,
    connection_history: Vec<ConnectionState>,
}

/// In-process display that keeps every write, for embedding and inspection.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    inner: Mutex<MemoryInner>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DisplayState {
        lock(&self.inner).state
    }

    pub fn writes(&self) -> Vec<(DisplayTarget, u64)> {
        lock(&self.inner).writes.clone()
    }

    pub fn connection_history(&self) -> Vec<ConnectionState> {
        lock(&self.inner).connection_history.clone()
    }
}

impl CountDisplay for MemoryDisplay {
    fn write_count(&self, target: DisplayTarget, value: u64) {
        let mut inner = lock(&self.inner);
        inner.state.set_count(target, value);
        inner.writes.push((target, value));
    }

    fn set_connection(&self, state: ConnectionState) {
        let mut inner = lock(&self.inner);
        inner.state.connection = Some(state);
        inner.connection_history.push(state);
    }
}

struct TerminalInner<W> {
    writer: W,
    state: DisplayState,
    last_rendered: Option<String>,
}

/// Line-oriented terminal renderer. A new line is printed only when the
/// rendered counters or the connection state change.
pub struct TerminalDisplay<W: Write + Send + 'static> {
    inner: Mutex<TerminalInner<W>>,
}

impl TerminalDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> TerminalDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(TerminalInner {
                writer,
                state: DisplayState::default(),
                last_rendered: None,
            }),
        }
    }

    pub fn state(&self) -> DisplayState {
        lock(&self.inner).state
    }

    pub fn into_writer(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }
}

impl<W: Write + Send + 'static> CountDisplay for TerminalDisplay<W> {
    fn write_count(&self, target: DisplayTarget, value: u64) {
        lock(&self.inner).state.set_count(target, value);
    }

    // Connection state is set once per fetch, after the counters.
    fn set_connection(&self, state: ConnectionState) {
        let mut inner = lock(&self.inner);
        inner.state.connection = Some(state);

        let line = inner.state.render_line();
        if inner.last_rendered.as_deref() == Some(line.as_str()) {
            return;
        }

        let timestamp = Local::now().format("%H:%M:%S");
        let written = writeln!(inner.writer, "[{}] {}", timestamp, line)
            .and_then(|_| inner.writer.flush());
        if let Err(e) = written {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
        inner.last_rendered = Some(line);
    }
}
