pub mod constants;
pub mod crc;
pub mod device;
pub mod error;
pub mod frame;
pub mod parser;
pub mod push;

mod ring;

pub use device::{RcUsbConfig, RcUsbSource};
pub use error::RcmError;
pub use frame::{
    channel_request_frame, enable_push_frame, Address, AckPolicy, DeviceKind, Frame, FrameHeader,
    PackType,
};
pub use parser::RcParser;
pub use push::{decode_rc_push, encode_rc_push, FiveWay, FlightMode, RcState, StickAxes};
