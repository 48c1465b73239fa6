//! ethersrv - An EtherDFS file server implementation in Rust.
//!
//! Serves host directory trees to legacy DOS clients speaking the EtherDFS
//! protocol: filesystem calls carried in raw Ethernet frames, no IP stack
//! involved. The dispatcher translates case-insensitive 8.3 pathnames onto
//! the case-sensitive host filesystem, answers one request at a time, and
//! replays cached replies when single-tasking clients retransmit.

pub mod answers;
pub mod config;
pub mod dispatch;
pub mod dos;
pub mod drives;
pub mod frame;
pub mod fs;
pub mod handles;
pub mod lock;
pub mod net;
pub mod parser;
pub mod resolver;
pub mod serializer;
mod server;

pub use server::Server;
