//! Runnable workflows built on the batch and distribution primitives.

/// End-to-end distribution run producing a checksummed batch artifact.
pub mod distribute;
