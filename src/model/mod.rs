pub mod capability;
pub mod common;
pub mod error;
pub mod family;
pub mod inventory;
pub mod request;
pub mod result;

pub use capability::*;
pub use common::*;
pub use error::*;
pub use family::*;
pub use inventory::*;
pub use request::*;
pub use result::*;
