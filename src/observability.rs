use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("clerk.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("clerk.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("clerk.client.request_duration_seconds");

pub(crate) static EXCHANGES_BEGUN: Counter = Counter::new("clerk.exchange.begun");
pub(crate) static EXCHANGES_COMMITTED: Counter = Counter::new("clerk.exchange.committed");
pub(crate) static EXCHANGES_FAILED: Counter = Counter::new("clerk.exchange.failed");
pub(crate) static EXCHANGES_ABANDONED: Counter = Counter::new("clerk.exchange.abandoned");
pub(crate) static EXCHANGES_IN_FLIGHT_REJECTED: Counter =
    Counter::new("clerk.exchange.in_flight_rejected");
pub(crate) static EXCHANGE_VALIDATION_ERRORS: Counter =
    Counter::new("clerk.exchange.validation_errors");
pub(crate) static EXCHANGE_DURATION: Moments = Moments::new("clerk.exchange.duration_seconds");

pub(crate) static SNAPSHOT_SAVES: Counter = Counter::new("clerk.persist.saves");
pub(crate) static SNAPSHOT_SAVE_ERRORS: Counter = Counter::new("clerk.persist.save_errors");
pub(crate) static SNAPSHOT_PURGES: Counter = Counter::new("clerk.persist.purges");
pub(crate) static SNAPSHOT_CORRUPT: Counter = Counter::new("clerk.persist.corrupt");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&EXCHANGES_BEGUN);
    collector.register_counter(&EXCHANGES_COMMITTED);
    collector.register_counter(&EXCHANGES_FAILED);
    collector.register_counter(&EXCHANGES_ABANDONED);
    collector.register_counter(&EXCHANGES_IN_FLIGHT_REJECTED);
    collector.register_counter(&EXCHANGE_VALIDATION_ERRORS);
    collector.register_moments(&EXCHANGE_DURATION);

    collector.register_counter(&SNAPSHOT_SAVES);
    collector.register_counter(&SNAPSHOT_SAVE_ERRORS);
    collector.register_counter(&SNAPSHOT_PURGES);
    collector.register_counter(&SNAPSHOT_CORRUPT);
}
