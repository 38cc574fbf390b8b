mod epoch;
mod interface;
mod mono_clock;
mod system;

pub use epoch::*;
pub use interface::*;
pub use mono_clock::*;
pub use system::*;
