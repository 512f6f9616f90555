//! Metro network tracker server.
//!
//! Answers route and fare queries over a metro fare graph, and simulates
//! trains shuttling along their lines, broadcasting every move.

pub mod broadcast;
pub mod cache;
pub mod config;
pub mod domain;
pub mod lines;
pub mod movement;
pub mod network;
pub mod scheduler;
pub mod store;
pub mod web;
