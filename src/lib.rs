//! tlsforge builds, parses, mutates and replays TLS and DTLS handshake
//! traffic.
//!
//! Every wire field of a message can be left to be computed from the
//! connection state, or overridden with an arbitrary value, including
//! values that break the protocol. Messages pass through a handler that
//! prepares and serializes them (or parses them) and then applies them to
//! the [`TlsContext`].
//!
//! ```no_run
//! use tlsforge::message::{ClientHello, HandshakeBody, HandshakeMessage, ProtocolMessage};
//! use tlsforge::{process_outgoing, Config, TlsContext};
//!
//! let mut ctx = TlsContext::new(Config::default());
//! let mut hello: ProtocolMessage =
//!     HandshakeMessage::new(HandshakeBody::ClientHello(ClientHello::new())).into();
//! let bytes = process_outgoing(&mut ctx, &mut hello).unwrap();
//! assert_eq!(bytes[0], 0x01);
//! ```
#![forbid(unsafe_code)]
#![warn(clippy::all)]
// #![deny(missing_docs)]

#[macro_use]
extern crate log;

mod config;
pub use config::{Config, ConfigBuilder};

mod context;
pub use context::{Session, TlsContext};

pub mod crypto;

mod error;
pub use error::{CryptoSource, Error, Result};

pub mod fragment;

mod handler;
pub use handler::{
    parse_fragments, prepare_dtls_fragments, process_incoming, process_incoming_dtls,
    process_outgoing, process_outgoing_dtls, serialize_fragments,
};

mod layer;
pub use layer::{receive_messages, send_messages};

pub mod message;

pub mod record;

mod rng;
pub use rng::SeededRng;

pub mod transport;

pub mod types;

mod util;
