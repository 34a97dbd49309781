//! End-to-end tests of the public adapter.

pub(crate) mod support;

mod scenario;
