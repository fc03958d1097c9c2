pub mod error;
pub mod preconditions;
pub mod waiter;

pub use error::*;
pub use preconditions::*;
pub use waiter::*;
