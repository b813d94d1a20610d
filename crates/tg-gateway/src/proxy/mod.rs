//! The streaming reverse proxy: relay core and request correlation.

pub mod correlation;
pub mod relay;
