//! Small platform helpers shared by the client modules.

pub mod browser;
pub mod clock;
pub mod spawn;
