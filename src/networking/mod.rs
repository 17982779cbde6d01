//! The TCP wire protocol between clients and a `flowerdb_server`.
//!
//! Every message is a single BSON document; the document's own length
//! prefix delimits it on the stream. A client sends a [message::RequestEnvelope]
//! and waits for the matching [message::ResponseEnvelope] before sending
//! the next request.

pub mod frame;
pub mod message;

pub use frame::{encode_frame, read_frame, write_frame, write_raw_frame, MAX_FRAME_SIZE};
pub use message::*;
