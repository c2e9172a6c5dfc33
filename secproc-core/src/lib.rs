//! Object store, key-container/certificate provisioners, the derivation
//! engine's orchestration, and the processor handle — built on the
//! `secproc-crypto` L0/L1/L2 primitives.

pub mod certstore;
pub mod derive;
pub mod processor;
pub mod provision;
pub mod session;
pub mod store;
pub mod types;
