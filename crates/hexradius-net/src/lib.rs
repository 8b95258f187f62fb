//! HexRadius Networking Layer
//!
//! This crate carries the authoritative game core over TCP:
//!
//! - [`codec`]: length-prefixed framing of the tagged message union
//! - [`server`]: accept loop, per-connection tasks and the session task
//!   owning lobby state and the turn engine
//! - [`mirror`]: the client-side replica applying authoritative deltas
//! - [`client`]: a headless client runner over a mirror
//!
//! # Architecture
//!
//! The server is logically single-threaded over the game state: socket
//! readers decode frames and feed one event channel whose consumer owns
//! every mutation, while outbound messages go through per-connection
//! queues. Clients apply messages in receipt order; for one action the
//! canonical order is action echo, UPDATE, animation messages, TURN.

pub mod client;
pub mod codec;
pub mod mirror;
pub mod server;

pub use client::{ClientConfig, ClientError};
pub use codec::{decode_payload, encode_frame, read_frame, write_frame, CodecError, MAX_MSGSIZE};
pub use mirror::{Mirror, MirrorPhase};
pub use server::{ServerConfig, ServerError};
