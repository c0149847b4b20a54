//! Property-based tests for partitioning and descriptor constants.

mod partition_props;
