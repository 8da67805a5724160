//! Long-poll command bot for the VK messaging API.
//!
//! [`bot::Bot`] polls `messages.getLongPollHistory`, keeps the messages whose
//! text starts with the configured prefix and hands them to
//! [`router::Router`], which dispatches `<prefix> <command> [args...]` to the
//! handlers registered in a [`registry::CommandRegistry`] and sends back
//! whatever they reply.

pub mod api;
pub mod bot;
pub mod commands;
pub mod config;
pub mod cursor;
pub mod error;
pub mod poll;
pub mod registry;
pub mod router;

#[cfg(test)]
mod testing;
