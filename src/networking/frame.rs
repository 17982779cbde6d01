use bson::Document;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StoreError};

/// The largest frame either side will send or accept.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// The smallest valid BSON document: a length prefix and a terminator.
const MIN_FRAME_SIZE: usize = 5;

/// Reads one BSON document from the stream.
///
/// Returns `Ok(None)` if the stream ends cleanly before a new frame starts.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Document>>
where
    R: AsyncRead + Unpin,
{
    // Read the length prefix...
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = i32::from_le_bytes(prefix);
    let len = usize::try_from(len)
        .ok()
        .filter(|n| (MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(n))
        .ok_or_else(|| StoreError::Protocol(format!("invalid frame length {}", len)))?;

    // Read the rest of the document (bson doesn't support async)...
    let mut buff = vec![0u8; len];
    buff[..4].copy_from_slice(&prefix);
    reader.read_exact(&mut buff[4..]).await?;

    let doc = Document::from_reader(&mut buff.as_slice())?;
    Ok(Some(doc))
}

/// Serialises one BSON document into a frame, checking its size.
pub fn encode_frame(doc: &Document) -> Result<Vec<u8>> {
    let mut buff: Vec<u8> = Vec::new();
    doc.to_writer(&mut buff)?;
    if buff.len() > MAX_FRAME_SIZE {
        return Err(StoreError::Protocol(format!(
            "frame of {} bytes exceeds the {} byte limit",
            buff.len(),
            MAX_FRAME_SIZE
        )));
    }
    Ok(buff)
}

/// Writes an already encoded frame to the stream and flushes it.
pub async fn write_raw_frame<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes one BSON document to the stream and flushes it.
///
/// Nothing is written if the document is too large to send.
pub async fn write_frame<W>(writer: &mut W, doc: &Document) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(doc)?;
    write_raw_frame(writer, &frame).await
}
