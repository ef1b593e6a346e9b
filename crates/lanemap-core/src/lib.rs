//! Core data model for a layered lane-network map.
//!
//! Provides the geometric primitives ([`primitives`]), the open polymorphic
//! regulatory rule family with its visitor seam ([`rules`]), and the
//! five-layer id-indexed map with reverse-usage lookups ([`map`]).

pub mod map;
pub mod primitives;
pub mod rules;
