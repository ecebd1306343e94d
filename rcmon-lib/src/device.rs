//! USB byte source for RM510-family remote controllers.
//!
//! The controller enumerates as a CDC ACM composite device (VID 0x2CA3,
//! PID 0x0040 before activation, 0x1020 once active) and speaks DUML over
//! the bulk data endpoints. After claiming the interface the link needs
//! the usual ACM bring-up — line coding 115200 8N1 plus DTR/RTS — followed
//! by the enable-push command; the controller then streams push frames on
//! its own. Some firmware revisions stop pushing after an idle period, so
//! the read loop falls back to explicit channel polling when the stream
//! goes quiet.

use crate::constants::{DJI_PID_ACTIVE, DJI_PID_INIT, DJI_VID};
use crate::error::RcmError;
use crate::frame::{channel_request_frame, enable_push_frame};
use crate::parser::RcParser;
use bytes::Bytes;
use nusb::io::{EndpointRead, EndpointWrite};
use nusb::transfer::{Bulk, ControlOut, ControlType, Recipient};
use nusb::Interface;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, trace, warn};

/// CDC ACM class requests.
const SET_LINE_CODING: u8 = 0x20;
const SET_CONTROL_LINE_STATE: u8 = 0x22;

/// 115200 baud, 1 stop bit, no parity, 8 data bits.
const LINE_CODING_115200_8N1: [u8; 7] = [0x00, 0xC2, 0x01, 0x00, 0x00, 0x00, 0x08];

const READ_BUFFER_LEN: usize = 1024;
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long the push stream may stay silent before polling kicks in.
const PUSH_TIMEOUT: Duration = Duration::from_secs(2);
/// Interval between channel requests while polling.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Which interface and endpoints carry the DUML stream.
///
/// The defaults match the ACM data interface layout seen on RC-N1/RC-N2
/// hardware; override them if `lsusb -v` shows the bulk pair elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct RcUsbConfig {
    pub interface: u8,
    pub endpoint_in: u8,
    pub endpoint_out: u8,
    /// Skip the initial USB reset (some hosts dislike it).
    pub skip_reset: bool,
}

impl Default for RcUsbConfig {
    fn default() -> Self {
        Self {
            interface: 0,
            endpoint_in: 0x81,
            endpoint_out: 0x01,
            skip_reset: false,
        }
    }
}

/// An opened controller: claimed interface, persistent bulk endpoints, and
/// the outgoing sequence counter.
pub struct RcUsbSource {
    #[allow(dead_code)]
    interface: Interface,
    reader: EndpointRead<Bulk>,
    writer: EndpointWrite<Bulk>,
    sequence: u16,
}

impl RcUsbSource {
    /// Open the first connected controller with the default configuration.
    pub async fn open() -> Result<Self, RcmError> {
        Self::with_config(RcUsbConfig::default()).await
    }

    pub async fn with_config(config: RcUsbConfig) -> Result<Self, RcmError> {
        info!("Searching for RM510 remote controller...");
        let device_info = nusb::list_devices()
            .await?
            .find(|d| {
                d.vendor_id() == DJI_VID
                    && (d.product_id() == DJI_PID_INIT || d.product_id() == DJI_PID_ACTIVE)
            })
            .ok_or(RcmError::DeviceNotFound)?;

        info!(
            "Found controller (PID {:#06x}) on bus {} addr {}",
            device_info.product_id(),
            device_info.bus_id(),
            device_info.device_address()
        );

        let device = device_info.open().await?;

        if !config.skip_reset {
            info!("Resetting device...");
            device.reset().await?;
        } else {
            debug!("Skipping USB reset (skip_reset=true)");
        }

        // cdc_acm will have bound the data interface on Linux; detach
        // everything so the claim below sticks.
        for interface_num in 0..4 {
            if let Err(e) = device.detach_kernel_driver(interface_num) {
                trace!("Could not detach interface {}: {}", interface_num, e);
            } else {
                debug!("Detached kernel driver from interface {}", interface_num);
            }
        }

        let interface = device.claim_interface(config.interface).await?;
        info!("Interface {} claimed", config.interface);

        configure_acm(&interface, config.interface).await?;

        let ep_in = interface.endpoint::<Bulk, _>(config.endpoint_in)?;
        let ep_out = interface.endpoint::<Bulk, _>(config.endpoint_out)?;
        let reader = ep_in.reader(READ_BUFFER_LEN).with_num_transfers(4);
        let writer = ep_out.writer(64).with_num_transfers(4);

        Ok(Self {
            interface,
            reader,
            writer,
            sequence: 0,
        })
    }

    fn next_sequence(&mut self) -> u16 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }

    async fn send_frame(&mut self, frame: Bytes) -> Result<(), RcmError> {
        trace!("Sending {} bytes: {:02x?}", frame.len(), frame.as_ref());
        timeout(WRITE_TIMEOUT, self.writer.write_all(&frame)).await??;
        timeout(WRITE_TIMEOUT, self.writer.flush_end_async()).await??;
        Ok(())
    }

    /// Ask the controller to start streaming push frames.
    pub async fn enable_push(&mut self) -> Result<(), RcmError> {
        let seq = self.next_sequence();
        debug!(seq, "Sending enable-push command");
        let frame = enable_push_frame(seq)?;
        self.send_frame(frame).await
    }

    /// One-shot channel poll; used while the push stream is silent.
    pub async fn send_channel_request(&mut self) -> Result<(), RcmError> {
        let seq = self.next_sequence();
        trace!(seq, "Sending channel request");
        let frame = channel_request_frame(seq)?;
        self.send_frame(frame).await
    }

    /// Read bulk data forever, feeding every chunk into `parser`.
    ///
    /// Sends the enable-push handshake first. If no push frame is decoded
    /// for two seconds, switches to polling with channel requests until
    /// the stream resumes. Returns only on a transport error.
    pub async fn run(&mut self, parser: &mut RcParser) -> Result<(), RcmError> {
        self.enable_push().await?;

        let mut buf = vec![0u8; READ_BUFFER_LEN];
        let mut last_push = Instant::now();
        let mut polling = false;

        loop {
            match timeout(READ_TIMEOUT, self.reader.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    return Err(RcmError::Protocol("bulk endpoint returned EOF".into()));
                }
                Ok(Ok(n)) => {
                    trace!("Read {} bytes", n);
                    let delivered = parser.feed(&buf[..n]);
                    if delivered > 0 {
                        last_push = Instant::now();
                        if polling {
                            info!("Push stream resumed, stopping channel polls");
                            polling = false;
                        }
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {} // read timeout; fall through to the poll check
            }

            if last_push.elapsed() >= PUSH_TIMEOUT {
                if !polling {
                    warn!(
                        "No push data for {:?}, falling back to channel polling",
                        PUSH_TIMEOUT
                    );
                    polling = true;
                }
                self.send_channel_request().await?;
                sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// CDC ACM bring-up: SET_LINE_CODING then SET_CONTROL_LINE_STATE with DTR
/// and RTS asserted. The controller ignores the baud rate but will not
/// stream until the control lines are up.
async fn configure_acm(interface: &Interface, interface_num: u8) -> Result<(), RcmError> {
    interface
        .control_out(ControlOut {
            control_type: ControlType::Class,
            recipient: Recipient::Interface,
            request: SET_LINE_CODING,
            value: 0,
            index: u16::from(interface_num),
            data: &LINE_CODING_115200_8N1,
        }, WRITE_TIMEOUT)
        .await?;

    // wValue bit 0 = DTR, bit 1 = RTS
    interface
        .control_out(ControlOut {
            control_type: ControlType::Class,
            recipient: Recipient::Interface,
            request: SET_CONTROL_LINE_STATE,
            value: 0x0003,
            index: u16::from(interface_num),
            data: &[],
        }, WRITE_TIMEOUT)
        .await?;

    debug!("ACM line coding and control lines configured");
    Ok(())
}
