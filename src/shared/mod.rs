pub mod errors;
pub mod pagination;
pub mod shutdown;
pub mod time;

pub use errors::*;
pub use pagination::*;
pub use shutdown::*;
pub use time::*;
