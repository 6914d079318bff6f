pub mod claim;
pub mod enums;
pub mod identity;
pub mod visit;

pub use claim::*;
pub use enums::*;
pub use identity::*;
pub use visit::*;
