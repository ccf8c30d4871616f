//! Estimation Services
//!
//! The pipeline stages and their supporting pieces: name normalization,
//! candidate retrieval, deduplication, platform filtering, generation
//! intake, the mandatory baseline, validation, and the pipeline controller
//! that sequences them.

pub mod dedup;
pub mod intake;
pub mod mandatory;
pub mod normalize;
pub mod pipeline;
pub mod platform_filter;
pub mod retrieval;
pub mod validation;
