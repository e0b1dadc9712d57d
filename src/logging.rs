//! Ambient tracing initialization
//!
//! This crate never decides its own log sink or filter configuration (the
//! design explicitly calls "logging sink configuration" an external
//! collaborator's concern, §1). What it does own is making sure internal
//! `tracing` spans/events have somewhere to go if the host process hasn't
//! already installed a subscriber — mirroring the teacher's
//! `coordinator_demo::init_tracing`, minus the JSON/Uptime formatting a
//! standalone binary needs and a demo library does not.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a default `tracing-subscriber` (env-filtered, human-readable)
/// exactly once per process. Safe to call from every entry point
/// (`ctx_create`, `init`, test setup); the second and later calls are no-ops.
/// If the host has already installed its own global subscriber, `try_init`
/// fails silently here — we never fight over the global dispatcher.
pub fn init_default_subscriber() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repverify=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .try_init();
    });
}
