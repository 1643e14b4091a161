//! IPC Relay — forwards the already-validated request body to a Unix
//! domain socket upstream and streams the reply back chunk by chunk.
//!
//! Grounded on `examples/original_source/server/ipcproxy.go`: dial, write
//! the full body, then read in `32 KiB` chunks. A chunk that is both
//! shorter than the buffer *and* ends in `\n` is the final frame; anything
//! else gets flushed to the client immediately and the loop continues.

use bytes::Bytes;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const CHUNK_SIZE: usize = 32 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum IpcRelayError {
    #[error("ipc dial error")]
    Dial,
    #[error("ipc write error")]
    Write,
    #[error("ipc read error")]
    Read,
}

fn is_final_chunk(n: usize, buf: &[u8]) -> bool {
    n < CHUNK_SIZE && n > 1 && buf[n - 1] == b'\n'
}

/// Dials, writes `request_body`, and returns a stream of the reply body.
/// Dial/write/first-read failures are reported synchronously so the caller
/// can still send a JSON error envelope; once streaming has started, a
/// later read error just ends the stream early (the client has already
/// received a `200` and headers, so nothing better can be done).
pub async fn relay(
    socket_path: &Path,
    request_body: &[u8],
) -> Result<ReceiverStream<Result<Bytes, std::io::Error>>, IpcRelayError> {
    let mut conn = UnixStream::connect(socket_path).await.map_err(|_| IpcRelayError::Dial)?;
    conn.write_all(request_body).await.map_err(|_| IpcRelayError::Write)?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let n = conn.read(&mut buf).await.map_err(|_| IpcRelayError::Read)?;
    let first_chunk = Bytes::copy_from_slice(&buf[..n]);
    let mut done = is_final_chunk(n, &buf);

    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(4);
    tokio::spawn(async move {
        if tx.send(Ok(first_chunk)).await.is_err() {
            return;
        }
        while !done {
            match conn.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    done = is_final_chunk(n, &buf);
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    if tx.send(Ok(chunk)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
            }
        }
    });

    Ok(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_chunk_requires_short_read_and_trailing_newline() {
        let full = vec![b'x'; CHUNK_SIZE];
        assert!(!is_final_chunk(CHUNK_SIZE, &full));

        let mut short = vec![b'x'; 10];
        short[9] = b'\n';
        assert!(is_final_chunk(10, &short));

        let mut no_newline = vec![b'x'; 10];
        no_newline[9] = b'y';
        assert!(!is_final_chunk(10, &no_newline));
    }
}
