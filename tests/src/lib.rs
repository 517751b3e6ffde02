//! # FleetLine Test Suite
//!
//! Cross-crate tests that need a running node.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── support.rs          # node on an ephemeral port, token minting, socket helpers
//! │   ├── location_fanout.rs  # producer → subscriber over real sockets
//! │   └── trip_flows.rs       # trip status over HTTP plus the incident workflow
//! └── benches/
//!     └── broadcast_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fl-tests
//! cargo bench -p fl-tests
//! ```

pub mod integration;
