//! Queries over a [`lanemap_core::map::LaneMap`].
//!
//! Provides the reference-finding traversal ([`references`]) and one-pass
//! extraction helpers for lane segments, traffic lights, and stop lines
//! ([`extract`]).

pub mod extract;
pub mod references;
