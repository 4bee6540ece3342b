pub mod discovery;
#[cfg(test)]
pub mod mock;
pub mod serial;
pub mod traits;

pub use discovery::{find_serial_ports, PortInfo};
pub use serial::SerialTransport;
pub use traits::ModemTransport;
