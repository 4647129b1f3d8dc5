pub mod ecs;
pub mod error;
pub mod math;
pub mod components;

// Re-exports
pub use ecs::{Component, ComponentStore, EntityId, System, SystemRegistry, World};
pub use error::EcsError;
pub use components::Transform;
