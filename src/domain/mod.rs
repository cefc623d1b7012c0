// Domain layer: registry records, result rows and the ports the core drives.

pub mod model;
pub mod ports;
