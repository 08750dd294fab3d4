#![allow(dead_code)]

use formstate::{FormOptions, FormToolkit};
use futures::executor::LocalPool;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Set `RUST_LOG=formstate=trace` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A form over `initial` without handlers and without an initial validation pass.
pub fn idle_form(pool: &LocalPool, initial: Value) -> FormToolkit {
    init_tracing();
    FormOptions::new(pool.spawner())
        .initial_values(initial)
        .initial_is_validating(false)
        .build()
        .expect("valid options")
}
