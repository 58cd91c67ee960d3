//! Integration test entry point for odoo-rpc-client.
//!
//! Run with: cargo test -p odoo-rpc-client --test integration

mod harness;
