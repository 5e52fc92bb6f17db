//! In-memory bearer pair.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use meshprov_core::Bearer;
use tokio::sync::mpsc;

/// One end of an in-memory link.
///
/// Dropping or closing one end makes the other end's `recv` return
/// `Ok(None)` once the queued PDUs are drained.
#[derive(Debug)]
pub struct LoopbackBearer {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

/// Two connected bearer ends.
pub fn loopback() -> (LoopbackBearer, LoopbackBearer) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (LoopbackBearer { tx: Some(a_tx), rx: a_rx }, LoopbackBearer { tx: Some(b_tx), rx: b_rx })
}

impl LoopbackBearer {
    /// Stop sending; the peer sees the link close.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

#[async_trait]
impl Bearer for LoopbackBearer {
    async fn send(&mut self, pdu: Bytes) -> io::Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        tx.send(pdu).map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }

    fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}
