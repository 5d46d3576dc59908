//! Resilience primitives shared by the tracker client and sync engine.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod shutdown;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use rate_limiter::{RateLimitConfig, RateLimitError, RateLimiter};
pub use shutdown::ShutdownSignal;
