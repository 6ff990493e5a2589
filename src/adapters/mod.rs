// Adapters layer: concrete display surfaces. The HTTP source lives in core::client.

pub mod display;
