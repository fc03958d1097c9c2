pub mod firewall;
pub mod iptables;
pub mod memory;

pub use firewall::*;
pub use iptables::*;
pub use memory::*;
