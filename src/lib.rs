//! Primitives, key-store envelope, key-ladder emulation, and
//! key-derivation math for a software secure-processor simulator.
//!
//! This crate has no notion of object storage or a running processor —
//! that lives in `secproc-core`, which composes these building blocks
//! against provisioned key handles. Everything here operates on byte
//! slices and opaque key material.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod envelope;
pub mod error;
pub mod kdf;
pub mod ladder;
pub mod primitives;
pub mod rsakey;
pub mod wire;

pub use error::{SecError, SecResult};
