//! SpruceKit session server and client
//!
//! Wallet sign-in sessions: the server issues nonces, verifies signed sign-in
//! messages and tracks sessions; the client drives the flow from a wallet and
//! hangs storage and credential modules off the signed-in provider.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
