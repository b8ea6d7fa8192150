//! Foundation module - shared utilities used by the cache and scene modules

pub mod logging;
