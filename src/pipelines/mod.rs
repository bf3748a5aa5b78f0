//! Workflow pipelines orchestrating stateless services.

pub mod sign;
