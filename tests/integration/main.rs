//! Integration tests against mock Gamma and CLOB servers

mod common;
mod config_test;
mod discovery_test;
mod lookup_test;
mod pipeline_test;
