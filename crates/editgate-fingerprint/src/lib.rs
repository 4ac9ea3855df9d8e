//! editgate Fingerprints
//!
//! Deterministic content fingerprints used for optimistic concurrency control.
//!
//! # Core Concepts
//!
//! - [`Fingerprint`]: 32-byte BLAKE3 digest of a file's exact bytes
//! - [`FingerprintService`]: reads files and derives their fingerprint
//! - [`FileSnapshot`]: file bytes and fingerprint captured from one read
//!
//! # Example
//!
//! ```rust,ignore
//! use editgate_fingerprint::FingerprintService;
//!
//! let service = FingerprintService::new();
//! let before = service.fingerprint("notes.txt").await?;
//! // ... later ...
//! let after = service.fingerprint("notes.txt").await?;
//! if before != after {
//!     println!("notes.txt changed underneath us");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod fingerprint;
mod service;

pub use fingerprint::{Fingerprint, FingerprintParseError, FINGERPRINT_LEN};
pub use service::{FileSnapshot, FingerprintError, FingerprintService};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
