//! Protocol module containing the control message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_client_msg, decode_relay_msg, encode, ProtocolError};
pub use messages::*;
