pub mod aggregator;
pub mod backend;
pub mod binding;
pub mod config;
pub mod draw_group;
pub mod error;
pub mod instance;
pub mod mesh;
pub mod sync;
pub mod task;
pub mod transform_system;

pub use aggregator::{MeshAggregator, MeshHandle, MeshResource};
pub use backend::{BufferDesc, BufferHandle, BufferKind, HeadlessBackend, ResourceBackend, WgpuBackend};
pub use binding::MeshBinding;
pub use config::{AggregatorConfig, MAX_DRAWGROUP_INSTANCE_COUNT, MAX_DRAWGROUP_MESH_COUNT};
pub use draw_group::{DrawCommand, DrawGroup, DrawGroupId, GroupBuffers, LayoutState};
pub use error::RenderError;
pub use instance::{PerInstanceRecord, TextureBinding};
pub use mesh::{Mesh, Vertex};
pub use sync::{InstanceMessage, InstanceSyncQueue};
pub use task::{Access, BufferAccess, FrameTasks, GpuTask};
pub use transform_system::TransformSystem;

// Re-export glam types for consistent version usage
pub use glam;
