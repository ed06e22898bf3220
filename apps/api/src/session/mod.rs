pub mod engine;
pub mod handlers;
pub mod persistence;
pub mod registry;

pub use engine::SessionError;
pub use registry::SessionRegistry;
