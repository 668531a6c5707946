pub mod coordinator;
pub mod estimate;
pub mod search;
pub mod view2d;

pub use coordinator::*;
pub use estimate::*;
pub use search::*;
pub use view2d::*;
