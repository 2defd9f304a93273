//! TCP transfer engine
//!
//! The client asks for a byte count on one line; the server streams exactly
//! that many filler bytes back and closes. The client knows the expected
//! total from its own request, so the stream needs no end marker.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::Protocol;
use crate::stats::TransferResult;

/// Filler chunk written per syscall on the serving side
const SEND_CHUNK: usize = 64 * 1024;

/// Longest request line the server will buffer; a u64 plus newline fits
/// in far less
const MAX_REQUEST_LINE: usize = 32;

/// Serve one accepted connection: read the requested byte count, stream
/// filler until it is satisfied, then close. Returns the bytes sent.
pub async fn serve_connection(stream: TcpStream) -> anyhow::Result<u64> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader).take(MAX_REQUEST_LINE as u64);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    if !line.ends_with('\n') {
        bail!("request line missing newline or too long");
    }

    let file_size: u64 = line.trim().parse().context("invalid request line")?;
    if file_size == 0 {
        bail!("requested size must be positive");
    }

    let chunk = vec![0u8; SEND_CHUNK];
    let mut sent: u64 = 0;
    while sent < file_size {
        let n = (file_size - sent).min(SEND_CHUNK as u64) as usize;
        writer.write_all(&chunk[..n]).await?;
        sent += n as u64;
    }
    writer.shutdown().await?;

    debug!("TCP transfer served: {} bytes", sent);
    Ok(sent)
}

/// Run one measured download: connect, request `file_size` bytes, time the
/// read until the full count arrives or the peer closes early. Early close
/// counts what was received; TCP delivery itself is always 100%.
pub async fn measure(addr: SocketAddr, file_size: u64, id: u32) -> anyhow::Result<TransferResult> {
    if file_size == 0 {
        bail!("requested size must be positive");
    }

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("TCP connect to {}", addr))?;

    stream
        .write_all(format!("{}\n", file_size).as_bytes())
        .await?;

    let start = Instant::now();
    let mut buf = vec![0u8; SEND_CHUNK];
    let mut received: u64 = 0;

    while received < file_size {
        let want = (file_size - received).min(buf.len() as u64) as usize;
        let n = stream.read(&mut buf[..want]).await?;
        if n == 0 {
            debug!(
                "TCP transfer #{}: peer closed after {} of {} bytes",
                id, received, file_size
            );
            break;
        }
        received += n as u64;
    }
    let duration = start.elapsed();

    Ok(TransferResult::new(
        Protocol::Tcp,
        id,
        received,
        duration,
        100.0,
    ))
}
