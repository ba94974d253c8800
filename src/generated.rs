//! Generated provider protocol types.
//!
//! Compiled from `proto/provider.proto` by the build script.

include!(concat!(env!("OUT_DIR"), "/hemmer.provider.v1.rs"));
