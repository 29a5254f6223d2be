//! Wyoming frame codec.
//!
//! A frame is a JSON header line, optionally followed by a JSON data block
//! (`data_length` bytes) and a raw payload (`payload_length` bytes). A peer
//! that hangs up part way through a frame is a normal disconnect, so every
//! short read is reported as end of stream rather than an error.

use std::io::ErrorKind;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::event::Event;
use crate::error::ProtocolError;

/// Protocol version written into every outgoing header.
pub const PROTOCOL_VERSION: &str = "1.5.0";

/// Longest header line accepted before the connection is dropped.
pub const MAX_HEADER_BYTES: usize = 1024 * 1024;

/// Largest data block or payload accepted in a single frame.
pub const MAX_BLOCK_BYTES: usize = 16 * 1024 * 1024;

/// Read the next event. `Ok(None)` means the peer closed the stream.
pub async fn read_event<R>(reader: &mut R) -> Result<Option<Event>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let line = loop {
        let mut line = Vec::new();
        let read = (&mut *reader)
            .take(MAX_HEADER_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;

        if read == 0 {
            return Ok(None);
        }

        if line.last() != Some(&b'\n') {
            if line.len() > MAX_HEADER_BYTES {
                return Err(ProtocolError::Decode(format!(
                    "header exceeds {} bytes",
                    MAX_HEADER_BYTES
                )));
            }
            debug!("Stream ended inside a header ({} bytes)", line.len());
            return Ok(None);
        }

        // Stray blank lines between frames are tolerated.
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        break line;
    };

    let header: Value = serde_json::from_slice(&line)
        .map_err(|e| ProtocolError::Decode(format!("invalid header JSON: {}", e)))?;
    let Value::Object(mut header) = header else {
        return Err(ProtocolError::Decode("header is not a JSON object".into()));
    };

    let kind = match header.remove("type") {
        Some(Value::String(kind)) => kind,
        Some(_) => return Err(ProtocolError::Decode("'type' must be a string".into())),
        None => return Err(ProtocolError::Decode("header has no 'type'".into())),
    };

    let mut data = match header.remove("data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ProtocolError::Decode("'data' must be an object".into())),
    };

    let data_length = length_field(&header, "data_length")?;
    let payload_length = length_field(&header, "payload_length")?;

    if data_length > 0 {
        let Some(block) = read_block(reader, data_length).await? else {
            debug!("Stream ended inside a data block for '{}'", kind);
            return Ok(None);
        };
        let extra: Value = serde_json::from_slice(&block)
            .map_err(|e| ProtocolError::Decode(format!("invalid data block: {}", e)))?;
        let Value::Object(extra) = extra else {
            return Err(ProtocolError::Decode("data block is not a JSON object".into()));
        };
        data.extend(extra);
    }

    let payload = if payload_length > 0 {
        let Some(block) = read_block(reader, payload_length).await? else {
            debug!("Stream ended inside a payload for '{}'", kind);
            return Ok(None);
        };
        Some(block)
    } else {
        None
    };

    Ok(Some(Event {
        kind,
        data,
        payload,
    }))
}

/// Write one event and flush it.
pub async fn write_event<W>(writer: &mut W, event: &Event) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode(event)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Serialize an event into its wire form.
pub fn encode(event: &Event) -> Result<Vec<u8>, ProtocolError> {
    let mut header = Map::new();
    header.insert("type".into(), Value::String(event.kind.clone()));
    if !event.data.is_empty() {
        header.insert("data".into(), Value::Object(event.data.clone()));
    }
    header.insert("version".into(), Value::String(PROTOCOL_VERSION.into()));
    header.insert("payload_length".into(), Value::from(event.payload_len()));

    let mut bytes = serde_json::to_vec(&Value::Object(header))?;
    bytes.push(b'\n');
    if let Some(payload) = &event.payload {
        bytes.extend_from_slice(payload);
    }
    Ok(bytes)
}

fn length_field(header: &Map<String, Value>, key: &str) -> Result<usize, ProtocolError> {
    let length = match header.get(key) {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| ProtocolError::Decode(format!("'{}' must be a non-negative integer", key)))?
            as usize,
    };
    if length > MAX_BLOCK_BYTES {
        return Err(ProtocolError::Decode(format!(
            "'{}' of {} exceeds the {} byte limit",
            key, length, MAX_BLOCK_BYTES
        )));
    }
    Ok(length)
}

/// Read exactly `len` bytes, or `None` if the stream ends first.
async fn read_block<R>(reader: &mut R, len: usize) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut block = vec![0u8; len];
    match reader.read_exact(&mut block).await {
        Ok(_) => Ok(Some(block)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}
