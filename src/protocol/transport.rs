//! Bus transport abstraction.
//!
//! Concrete implementations:
//! - I²C slave peripheral (ESP-IDF)
//! - scripted in-memory bus (tests, simulation)
//!
//! [`pump`] is the body of the frame-arrival context: it feeds every
//! received frame to the [`BusLink`] and keeps the outbound status frame
//! current so a host read never waits on the control loop.

use super::mailbox::BusLink;

/// Frame-oriented, non-blocking bus channel.
pub trait BusTransport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Copy the next frame the host wrote into `buf`.
    /// Returns `Ok(None)` when nothing is pending.
    fn receive_frame(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Stage `frame` as the reply to the host's next read.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// A null transport that never receives and discards every reply.
pub struct NullTransport;

impl BusTransport for NullTransport {
    type Error = ();

    fn receive_frame(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, ()> {
        Ok(None)
    }

    fn send_frame(&mut self, _frame: &[u8]) -> Result<(), ()> {
        Ok(())
    }
}

/// Receive buffer; larger than any valid frame so over-long ones are seen
/// as such instead of truncated into something valid.
const RX_SCRATCH: usize = 16;

/// Drain pending frames into `link`, then stage the current status reply.
/// Returns the number of frames handled.
pub fn pump<T: BusTransport>(link: &BusLink, transport: &mut T) -> Result<usize, T::Error> {
    let mut buf = [0u8; RX_SCRATCH];
    let mut handled = 0;
    while let Some(len) = transport.receive_frame(&mut buf)? {
        let len = len.min(buf.len());
        // Rejected frames are already counted and logged by the link.
        let _ = link.on_receive(&buf[..len]);
        handled += 1;
    }
    transport.send_frame(&link.on_request())?;
    Ok(handled)
}
