//! Property-based tests for bounds aggregation

mod bounds_union;
