//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's API while
//! conforming to the uniform completion contract used by agents.

pub mod openai;
