//! Concrete backend implementations.

pub mod http;
