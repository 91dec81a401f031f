//! Output formatting for a finished reading.

use std::io::{self, Write};

use crate::protocol::Temperature;

/// How a reading is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// `temperature: 23.500000°C`
    #[default]
    Labelled,
    /// `23.500000`, for scripts.
    Bare,
}

pub fn format_reading(temperature: Temperature, mode: OutputMode) -> String {
    match mode {
        OutputMode::Labelled => format!("temperature: {temperature}"),
        OutputMode::Bare => format!("{:.6}", temperature.celsius()),
    }
}

/// Writes readings in the configured mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    mode: OutputMode,
}

impl Reporter {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn report<W: Write>(&self, out: &mut W, temperature: Temperature) -> io::Result<()> {
        writeln!(out, "{}", format_reading(temperature, self.mode))
    }
}
