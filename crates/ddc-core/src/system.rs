use std::{num::NonZeroUsize, thread};

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// Get architecture.
#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// Number of CPUs available to this process, reported on registration.
pub fn cpu_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Fresh client identifier for this agent run.
///
/// Nothing is persisted: a restarted agent registers as a new client.
pub fn new_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
