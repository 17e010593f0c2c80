//! # Data-Pipeline Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Codec and version-resolution benchmarks
//! └── src/integration/  # Emitter → transport → forwarder → dispatcher flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dp-tests
//! cargo test -p dp-tests integration::
//! cargo bench -p dp-tests
//! ```

pub mod integration;
