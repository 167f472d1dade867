//! Copper fill autovoiding
//!
//! Cuts clearance voids into dynamic copper fills around the pads, vias,
//! pins, traces and other copper they must avoid, then smooths and cleans
//! the result. Boards are reached through the collaborator traits in
//! `host`; `server` wraps the engine in a JSON-lines protocol.

pub mod fill;
pub mod host;
pub mod server;
