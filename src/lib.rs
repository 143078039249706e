#[cfg(test)]
#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate log;

pub mod core;

#[cfg(target_os = "linux")]
pub mod linux;

use crate::core::dev::Error as DevError;

#[derive(Debug)]
pub enum Error {
    /// Indicates an error where a buffer is too small to hold a header or packet.
    Exhausted,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a checksum is invalid.
    Checksum,
    /// Indicates a valid packet the router does not act on.
    Ignored,
    /// Indicates an error sending or receiving via a device.
    Device(DevError),
    /// Indicates an invalid configuration with a description.
    Config(String),
}

impl From<DevError> for Error {
    fn from(err: DevError) -> Self {
        Error::Device(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Device(DevError::IO(err))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::Exhausted => write!(f, "buffer exhausted"),
            Error::Malformed => write!(f, "malformed packet"),
            Error::Checksum => write!(f, "invalid checksum"),
            Error::Ignored => write!(f, "ignored"),
            Error::Device(ref err) => write!(f, "device error: {:?}", err),
            Error::Config(ref msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
