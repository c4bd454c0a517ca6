//! Framing and encoding of packets on a byte stream.
//!
//! `Json` frames are one JSON document per line. `Bincode` frames carry a
//! big-endian `u32` length prefix followed by the bincode payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest payload accepted from the wire.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Json,
    Bincode,
}

impl WireFormat {
    /// Encodes `message` into a complete frame ready to be written.
    pub fn encode<T: Serialize>(&self, message: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            WireFormat::Json => {
                let mut frame = serde_json::to_vec(message)?;
                frame.push(b'\n');
                Ok(frame)
            }
            WireFormat::Bincode => {
                let payload = bincode::serialize(message)?;
                check_len(payload.len())?;
                let mut frame = Vec::with_capacity(payload.len() + 4);
                frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                frame.extend_from_slice(&payload);
                Ok(frame)
            }
        }
    }

    /// Decodes one frame payload as returned by [`WireFormat::read_frame`].
    pub fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, CodecError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(payload)?),
            WireFormat::Bincode => Ok(bincode::deserialize(payload)?),
        }
    }

    /// Reads the next frame payload. `Ok(None)` means the peer closed the
    /// stream cleanly between frames.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Option<Vec<u8>>, CodecError>
    where
        R: AsyncBufRead + Unpin,
    {
        match self {
            WireFormat::Json => loop {
                let mut line = Vec::new();
                let limit = MAX_FRAME_LEN as u64 + 1;
                if (&mut *reader).take(limit).read_until(b'\n', &mut line).await? == 0 {
                    return Ok(None);
                }
                // Longer than the limit means no newline within MAX_FRAME_LEN bytes.
                check_len(line.len())?;
                while matches!(line.last(), Some(b'\n' | b'\r')) {
                    line.pop();
                }
                if !line.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Some(line));
                }
            },
            WireFormat::Bincode => {
                let len = match reader.read_u32().await {
                    Ok(len) => len as usize,
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                check_len(len)?;
                let mut payload = vec![0u8; len];
                reader.read_exact(&mut payload).await?;
                Ok(Some(payload))
            }
        }
    }
}

fn check_len(size: usize) -> Result<(), CodecError> {
    if size > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge {
            size,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => write!(f, "json"),
            WireFormat::Bincode => write!(f, "bincode"),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(WireFormat::Json),
            "bincode" | "binary" => Ok(WireFormat::Bincode),
            other => Err(format!("unknown wire format '{}'", other)),
        }
    }
}
