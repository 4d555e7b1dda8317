//! Destinations for `DSPLY` output.
//!
//! - stdout (default)
//! - an in-memory buffer, for tests and embedding hosts
//! - silent, for batch runs that must not print
//!
//! Enum dispatch rather than a trait object: the set is closed.

use std::sync::Arc;

use parking_lot::Mutex;

/// Captures displayed lines in memory.
#[derive(Debug, Default)]
pub struct BufferDisplayHandler {
    buffer: Mutex<String>,
}

impl BufferDisplayHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self, text: &str) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(text);
        buffer.push('\n');
    }

    pub fn output(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

#[derive(Debug)]
pub enum DisplayHandler {
    Stdout,
    Buffer(BufferDisplayHandler),
    Silent,
}

impl DisplayHandler {
    pub fn display(&self, text: &str) {
        match self {
            Self::Stdout => println!("{text}"),
            Self::Buffer(handler) => handler.display(text),
            Self::Silent => {}
        }
    }

    /// Captured output; empty for handlers that do not capture.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(handler) => handler.output(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(handler) = self {
            handler.clear();
        }
    }
}

pub type SharedDisplayHandler = Arc<DisplayHandler>;

pub fn stdout_display() -> SharedDisplayHandler {
    Arc::new(DisplayHandler::Stdout)
}

pub fn buffer_display() -> SharedDisplayHandler {
    Arc::new(DisplayHandler::Buffer(BufferDisplayHandler::new()))
}

pub fn silent_display() -> SharedDisplayHandler {
    Arc::new(DisplayHandler::Silent)
}
