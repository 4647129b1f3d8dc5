pub mod entity;
pub mod component;
pub mod storage;
pub mod registry;
pub mod system;
pub mod world;

pub use entity::{EntityAllocator, EntityId};
pub use component::Component;
pub use storage::ComponentStore;
pub use registry::ComponentRegistry;
pub use system::{System, SystemRegistry};
pub use world::World;
