mod auction;
mod event;
mod lock;

pub use auction::*;
pub use event::*;
pub use lock::*;
