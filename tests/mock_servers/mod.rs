//! Mock upstream servers for integration testing.

pub mod aladhan;

pub use aladhan::MockAladhanServer;
