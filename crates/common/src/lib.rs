pub mod clickhouse;
pub mod domain;
pub mod nats;
pub mod postgres;
pub mod telemetry;
pub mod validation;

pub use clickhouse::*;
pub use domain::*;
pub use nats::*;
pub use postgres::*;
pub use telemetry::*;
pub use validation::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAggregateRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockEventRepository;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamConsumer;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockPullConsumer;
