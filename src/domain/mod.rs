// Domain layer: models and ports. Adapters and the poller depend on this, never the reverse.

pub mod model;
pub mod ports;
