use std::io;
use thiserror::Error;

/// The primary error type for the `rcmon` library.
#[derive(Error, Debug)]
pub enum RcmError {
    #[error("RC controller not found. Is the remote powered on and plugged in?")]
    DeviceNotFound,

    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("USB transfer error: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Timeout during USB operation: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Push payload too short: expected at least {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },

    #[error("Frame of {len} bytes exceeds the protocol maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Output buffer too small: frame needs {needed} bytes, capacity is {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}
