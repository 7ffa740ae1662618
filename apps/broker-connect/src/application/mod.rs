//! Application Layer
//!
//! Orchestrates the broker link lifecycle. Ports define the seams to the
//! broker, the credential store, and the portal identity collaborator;
//! use cases drive domain transitions through them.

pub mod ports;
pub mod use_cases;
