mod contracts;
mod logs;
mod notifiers;
mod providers;

pub use contracts::*;
pub use logs::*;
pub use notifiers::*;
pub use providers::*;
