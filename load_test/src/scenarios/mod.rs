// Scenarios module
// Contains load test scenario definitions

pub mod constant_request_rate;
pub mod probe;
