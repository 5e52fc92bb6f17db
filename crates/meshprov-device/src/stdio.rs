//! Line-oriented bearer: one hex-encoded PDU per line.
//!
//! Lets a provisioner (or a person with a terminal) talk to the device over
//! a pipe. Blank lines and lines starting with `#` are skipped.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use meshprov_core::Bearer;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::trace;

/// Bearer over any line reader and writer.
#[derive(Debug)]
pub struct LineBearer<R, W> {
    lines: Lines<R>,
    writer: W,
    open: bool,
}

impl<R, W> LineBearer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Bearer reading from `reader` and writing to `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self { lines: reader.lines(), writer, open: true }
    }

    #[cfg(test)]
    fn into_writer(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<R, W> Bearer for LineBearer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, pdu: Bytes) -> io::Result<()> {
        let mut line = hex::encode(&pdu);
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            trace!(line, "pdu line");
            let pdu = hex::decode(line)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            return Ok(Some(Bytes::from(pdu)));
        }
        self.open = false;
        Ok(None)
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
