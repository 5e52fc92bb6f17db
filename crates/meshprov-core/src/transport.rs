//! Bearer abstraction for provisioning PDUs.
//!
//! A bearer moves whole PDUs between the device and one provisioner. It is
//! message-oriented: every `recv` yields exactly one PDU, so the codec never
//! reassembles or splits frames. Production runs over a GATT characteristic,
//! tests use an in-memory loopback.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use meshprov_proto::ProxyHeader;

/// Message-oriented link to one provisioner.
#[async_trait]
pub trait Bearer: Send {
    /// Send one PDU.
    async fn send(&mut self, pdu: Bytes) -> io::Result<()>;

    /// Receive the next PDU.
    ///
    /// Returns `Ok(None)` once the peer closed the link. A message that
    /// cannot carry a PDU fails with `InvalidData` and is consumed; the link
    /// stays usable.
    async fn recv(&mut self) -> io::Result<Option<Bytes>>;

    /// Whether the link is still usable.
    fn is_open(&self) -> bool;
}

/// Adds and strips the one-byte proxy header used on the GATT provisioning
/// characteristic.
///
/// Only unsegmented provisioning messages are accepted; anything else fails
/// `recv` with `InvalidData`.
#[derive(Debug)]
pub struct ProxyFraming<B> {
    inner: B,
}

impl<B: Bearer> ProxyFraming<B> {
    /// Wrap a raw characteristic bearer.
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    /// Unwrap into the raw bearer.
    pub fn into_inner(self) -> B {
        self.inner
    }
}

#[async_trait]
impl<B: Bearer> Bearer for ProxyFraming<B> {
    async fn send(&mut self, pdu: Bytes) -> io::Result<()> {
        self.inner.send(ProxyHeader::wrap(&pdu)).await
    }

    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        let Some(message) = self.inner.recv().await? else {
            return Ok(None);
        };
        ProxyHeader::strip(&message)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Characteristic that records writes and replays queued notifications.
    #[derive(Default)]
    struct Characteristic {
        written: Vec<Bytes>,
        notifications: VecDeque<Bytes>,
    }

    #[async_trait]
    impl Bearer for Characteristic {
        async fn send(&mut self, pdu: Bytes) -> io::Result<()> {
            self.written.push(pdu);
            Ok(())
        }

        async fn recv(&mut self) -> io::Result<Option<Bytes>> {
            Ok(self.notifications.pop_front())
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn adds_and_strips_proxy_header() {
        let mut raw = Characteristic::default();
        raw.notifications.push_back(Bytes::from_static(&[0x03, 0x00, 0x05]));
        let mut framed = ProxyFraming::new(raw);

        assert_eq!(framed.recv().await.unwrap().unwrap().as_ref(), &[0x00, 0x05]);
        framed.send(Bytes::from_static(&[0x07])).await.unwrap();
        assert_eq!(framed.recv().await.unwrap(), None);

        let raw = framed.into_inner();
        assert_eq!(raw.written, vec![Bytes::from_static(&[0x03, 0x07])]);
    }

    #[tokio::test]
    async fn other_proxy_traffic_is_invalid_data() {
        let mut raw = Characteristic::default();
        raw.notifications.push_back(Bytes::from_static(&[0x01, 0xAA]));
        let mut framed = ProxyFraming::new(raw);

        let err = framed.recv().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
