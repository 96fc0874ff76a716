//! Protocol module containing wire message types and the framing codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_frame, encode_request, CodecError, WireFrame};
pub use messages::*;
pub use sequence::SequenceCounter;
