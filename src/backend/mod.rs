pub mod memory;
pub mod recording;
pub mod traits;

pub use memory::*;
pub use recording::*;
pub use traits::*;
