//! Newline framing for the text protocol
//!
//! Handles reading and writing single lines over streams.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors that can occur while framing lines
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Line too long (max {0} bytes)")]
    LineTooLong(usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Read one line, stripping the trailing `\n` and an optional `\r`
///
/// A stream that ends before a terminator counts as closed; the partial
/// line is discarded.
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> Result<String, FramingError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = max_len as u64 + 2;
    let mut buf = Vec::with_capacity(128);
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if buf.last() != Some(&b'\n') {
        if n as u64 >= limit {
            return Err(FramingError::LineTooLong(max_len));
        }
        return Err(FramingError::ConnectionClosed);
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    if buf.len() > max_len {
        return Err(FramingError::LineTooLong(max_len));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write one line followed by `\n`
pub async fn write_line<W>(writer: &mut W, text: &str) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(text.len() + 1);
    frame.extend_from_slice(text.as_bytes());
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Split a line into whitespace-separated tokens
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}
