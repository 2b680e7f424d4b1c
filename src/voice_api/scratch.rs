//! Scratch files for staged samples and synthesized audio
//!
//! A `ScratchFile` owns a named temp file that is removed when the guard
//! drops, so early returns, errors and cancelled futures all clean up.

use super::GatewayError;
use futures::{Stream, StreamExt};
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn create(dir: &Path, prefix: &str, extension: &str) -> Result<Self, GatewayError> {
        let suffix = format!(".{extension}");
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| {
                GatewayError::io(format!(
                    "Failed to create scratch file in {}: {e}",
                    dir.display()
                ))
            })?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn write_all(&self, bytes: &[u8]) -> Result<(), GatewayError> {
        tokio::fs::write(self.path(), bytes)
            .await
            .map_err(|e| self.io_error("write", &e))
    }

    /// Stream chunks into the file, failing once `max_bytes` is exceeded
    pub async fn write_stream<S, E>(&self, stream: S, max_bytes: u64) -> Result<u64, GatewayError>
    where
        S: Stream<Item = Result<bytes::Bytes, E>>,
        E: std::fmt::Display,
    {
        let mut stream = std::pin::pin!(stream);
        let mut out = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.path())
            .await
            .map_err(|e| self.io_error("open", &e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| GatewayError::transport(format!("Failed to read body: {e}")))?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(GatewayError::malformed(format!(
                    "Audio exceeds {max_bytes} bytes"
                )));
            }
            out.write_all(&chunk)
                .await
                .map_err(|e| self.io_error("write", &e))?;
        }
        out.flush().await.map_err(|e| self.io_error("flush", &e))?;
        Ok(written)
    }

    pub async fn read_all(&self) -> Result<Vec<u8>, GatewayError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| self.io_error("read", &e))
    }

    /// Open the file for streaming reads
    pub async fn open(&self) -> Result<(tokio::fs::File, u64), GatewayError> {
        let file = tokio::fs::File::open(self.path())
            .await
            .map_err(|e| self.io_error("open", &e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| self.io_error("stat", &e))?
            .len();
        Ok((file, len))
    }

    fn io_error(&self, op: &str, e: &std::io::Error) -> GatewayError {
        GatewayError::io(format!(
            "Failed to {op} scratch file {}: {e}",
            self.path().display()
        ))
    }
}
