// Domain layer: records and ports. Adapters implement the ports; core depends only on them.

pub mod model;
pub mod ports;
