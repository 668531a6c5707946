pub mod debounce;
pub mod microtask;

pub use debounce::*;
pub use microtask::*;
