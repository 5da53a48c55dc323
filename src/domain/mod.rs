// Domain layer: API records, reports and the ports the core is written against.

pub mod model;
pub mod ports;
