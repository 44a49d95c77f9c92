mod aggregate;
mod event;
mod result;

pub use aggregate::*;
pub use event::*;
pub use result::*;
