//! Operator tree: positional operators (C3) produce synthesized postings;
//! scoring operators (C4) consume them and dispatch across retrieval
//! models (C5).

pub mod positional;
pub mod scoring;
