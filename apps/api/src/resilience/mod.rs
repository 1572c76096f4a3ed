// Resilience primitives wrapped around external embedding providers.

pub mod circuit_breaker;

pub use circuit_breaker::{
    BreakerRegistry, BreakerSettings, BreakerStats, CircuitBreaker, CircuitError, CircuitState,
};
