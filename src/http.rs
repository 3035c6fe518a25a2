// src/http.rs
// Shared HTTP client for the generation backend

use std::time::Duration;

/// Idle connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Idle connection lifetime
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Create the shared HTTP client.
///
/// No request timeout is set here; a deadline, when configured, wraps the
/// whole generation call instead.
pub fn create_shared_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_shared_client() {
        let client = create_shared_client();
        drop(client);
    }
}
