// Domain layer: records, request/response types and the ports the core talks through.

pub mod model;
pub mod ports;
