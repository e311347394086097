use failsafe::{backoff, failure_policy, Config};
use std::time::Duration;

/// Creates a circuit breaker for outbound sink calls (CRM contact creation).
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// While OPEN, calls are rejected without reaching the remote service, so a
/// batch push stops early instead of hammering an endpoint that is down.
pub fn create_sink_circuit_breaker() -> impl failsafe::futures::CircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::futures::CircuitBreaker;
    use failsafe::Error;

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let cb = create_sink_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), Error<&str>> =
                cb.call(async { Err::<(), &str>("simulated error") }).await;
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(async { Ok::<(), &str>(()) }).await;

        match result {
            Err(Error::Rejected) => {}
            _ => panic!("Expected circuit to be open and reject requests"),
        }
    }

    #[tokio::test]
    async fn test_circuit_breaker_allows_success() {
        let cb = create_sink_circuit_breaker();

        let result: Result<i32, Error<&str>> = cb.call(async { Ok::<i32, &str>(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }
}
