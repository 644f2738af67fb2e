pub mod order;
pub mod payload;
pub mod ports;
pub mod remote_order;
