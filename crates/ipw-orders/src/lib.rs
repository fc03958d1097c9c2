pub mod lister;
pub mod reader;
pub mod systemconf;

pub use lister::*;
pub use reader::*;
pub use systemconf::*;
