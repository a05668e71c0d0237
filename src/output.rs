//! Where program output goes.  `print` and the echo of an evaluated
//! expression write whole lines through this trait, so the interpreter never
//! talks to stdout directly.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use log::warn;

pub trait Output {
    fn write_line(&mut self, text: &str);
}

/// Writes each line to the process's standard output.
#[derive(Debug, Default)]
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn write_line(&mut self, text: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();

        if let Err(e) = writeln!(handle, "{}", text) {
            warn!("Failed to write program output: {}", e);
        }
    }
}

/// Collects lines in memory.  Clones share one buffer, so a test can keep a
/// handle while the interpreter owns another.
#[derive(Debug, Default, Clone)]
pub struct CaptureOutput {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl Output for CaptureOutput {
    fn write_line(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_owned());
    }
}
