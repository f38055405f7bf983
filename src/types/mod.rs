mod admin;
mod catalogue;
mod forms;
mod messaging;

pub use admin::*;
pub use catalogue::*;
pub use forms::*;
pub use messaging::*;
