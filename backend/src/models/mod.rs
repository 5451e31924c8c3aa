pub mod event;
pub mod forecast;
pub mod limits;
pub mod pattern;
pub mod snapshot;
pub mod time;

pub use event::*;
pub use forecast::*;
pub use limits::*;
pub use pattern::*;
pub use snapshot::*;
pub use time::*;
