//! External output channel and the confidence gate in front of it.

mod gate;

use std::io::Write;

use thiserror::Error;

pub use gate::{GateDecision, OutputGate};

#[derive(Debug, Error)]
pub enum OutputChannelError {
    #[error("Output channel is not connected")]
    Disconnected,
    #[error("Output channel write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fire-and-forget string sink (a paired device, a socket, a log).
pub trait OutputChannel {
    fn is_connected(&self) -> bool;

    fn send(&mut self, message: &str) -> Result<(), OutputChannelError>;
}

/// Channel that is never connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl OutputChannel for NullOutput {
    fn is_connected(&self) -> bool {
        false
    }

    fn send(&mut self, _message: &str) -> Result<(), OutputChannelError> {
        Err(OutputChannelError::Disconnected)
    }
}

/// Writes each message as one line to any [`Write`] sink.
#[derive(Debug)]
pub struct WriterOutput<W: Write> {
    writer: W,
    connected: bool,
}

impl<W: Write> WriterOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            connected: true,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputChannel for WriterOutput<W> {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send(&mut self, message: &str) -> Result<(), OutputChannelError> {
        if !self.connected {
            return Err(OutputChannelError::Disconnected);
        }
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;
        Ok(())
    }
}
