pub mod engine;
pub mod mount;
pub mod surface;
pub mod viewer;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use engine::*;
pub use mount::*;
pub use surface::*;
pub use viewer::*;
pub use visibility::*;
