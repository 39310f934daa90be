use crate::error::ConfigError;
use crate::frame::{DEFAULT_LENGTH_SIZE, FrameCodec, MAX_LENGTH_SIZE};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_THREAD: usize = 16;
pub const DEFAULT_BUFSIZE: usize = 64 * 1024;
/// Largest read buffer a connection may allocate.
pub const MAX_BUFSIZE: usize = 16 * 1024 * 1024;

/// Deployment settings for the chat server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Worker pool size, i.e. how many connections are served at once.
    pub max_thread: usize,
    /// Bytes requested per socket read.
    pub bufsize: usize,
    /// Digit width of the frame length prefix.
    pub length_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_thread: DEFAULT_MAX_THREAD,
            bufsize: DEFAULT_BUFSIZE,
            length_size: DEFAULT_LENGTH_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_framing(self.length_size, self.bufsize)?;
        if self.max_thread == 0 {
            return Err(ConfigError::MaxThread);
        }
        Ok(())
    }

    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.length_size)
    }

    pub fn listen_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

/// Checks a prefix width and read size pair; shared by server and client.
pub fn validate_framing(length_size: usize, bufsize: usize) -> Result<(), ConfigError> {
    if !(1..=MAX_LENGTH_SIZE).contains(&length_size) {
        return Err(ConfigError::LengthSize {
            got: length_size,
            max: MAX_LENGTH_SIZE,
        });
    }
    if !(length_size..=MAX_BUFSIZE).contains(&bufsize) {
        return Err(ConfigError::BufferSize {
            bufsize,
            length_size,
            max: MAX_BUFSIZE,
        });
    }
    Ok(())
}
