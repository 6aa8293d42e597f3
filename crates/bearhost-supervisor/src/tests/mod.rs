//! Test suites for daemon supervision.

pub(crate) mod support;
