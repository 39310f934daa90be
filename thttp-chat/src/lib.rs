//! THTTP group chat server.
//!
//! Clients connect over TCP, sign in with a unique username, join one named
//! group at a time and chat with its members. Every message travels as a
//! length-prefixed frame whose payload is a small HTTP-like text message.
//!
//! - [`frame`] encodes and splits length-prefixed frames.
//! - [`message`] parses, validates and serializes requests and responses.
//! - [`registry`] holds connections, usernames and groups behind one lock.
//! - [`dispatcher`] runs the per-connection request loop and fan-out.
//! - [`pool`] bounds how many connections are served at once.
//! - [`server`] accepts TCP connections and wires the pieces together.
//! - [`client`] is a terminal client speaking the same protocol.
//! - [`cli`] and [`config`] describe the command line and deployment settings.

pub mod cli;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod message;
pub mod pool;
pub mod registry;
pub mod server;
