//! Route configuration modules

pub mod stream;
