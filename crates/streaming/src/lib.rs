pub mod fetch;
pub mod pipeline;
pub mod request;

pub use fetch::*;
pub use pipeline::*;
pub use request::*;
