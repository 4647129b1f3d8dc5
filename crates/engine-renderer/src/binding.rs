//! メッシュバインディングコンポーネント
//!
//! エンティティと（メッシュ, インスタンス番号）の対応。
//! インスタンス0（マスター）がジオメトリを持ち、以降のインスタンスは
//! `PerInstanceRecord`を1件追加するだけでジオメトリを共有する。

use engine_core::{Component, EntityId, Transform, World};
use glam::Mat4;

use crate::aggregator::{MeshAggregator, MeshHandle};
use crate::draw_group::DrawGroupId;
use crate::error::RenderError;
use crate::instance::{PerInstanceRecord, TextureBinding};
use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBinding {
    mesh: MeshHandle,
    instance: u32,
}

impl Component for MeshBinding {}

impl MeshBinding {
    /// マスターインスタンスを作成
    ///
    /// ジオメトリを集約器に追加して描画グループに登録し、インスタンス0を追加する。
    /// `MeshAggregator`はWorldのリソースとして登録済みであること。
    /// エラー時は集約器を変更しない。
    pub fn create_master(
        world: &mut World,
        entity: EntityId,
        group: DrawGroupId,
        mesh: Mesh,
        label: impl Into<String>,
        textures: TextureBinding,
    ) -> Result<Self, RenderError> {
        world.store::<MeshBinding>()?;
        let model = initial_model(world, entity);
        let aggregator = world.resource_mut::<MeshAggregator>()?;
        if aggregator.draw_group(group).is_none() {
            return Err(RenderError::UnknownDrawGroup(group));
        }

        let handle = aggregator.add_mesh(mesh, label);
        aggregator.register_mesh(group, handle)?;
        let instance = aggregator.add_instance(handle, PerInstanceRecord::new(model, textures))?;

        let binding = Self { mesh: handle, instance };
        world.insert(entity, binding)?;
        tracing::debug!(%entity, mesh = handle.raw(), "master mesh binding created");
        Ok(binding)
    }

    /// このメッシュの新しいインスタンスを`entity`に割り当てる
    ///
    /// マスター以外から呼ばれた場合、`entity`が既にバインド済みの場合は
    /// 警告を出して何もしない（`Ok(None)`）。
    pub fn instantiate(
        &self,
        world: &mut World,
        entity: EntityId,
        textures: TextureBinding,
    ) -> Result<Option<Self>, RenderError> {
        if !self.is_master() {
            tracing::warn!(
                %entity,
                mesh = self.mesh.raw(),
                instance = self.instance,
                "instantiate called on a non-master binding; ignoring"
            );
            return Ok(None);
        }
        if let Some(existing) = world.store::<MeshBinding>()?.get(entity) {
            tracing::warn!(
                %entity,
                mesh = existing.mesh.raw(),
                instance = existing.instance,
                "entity already has a mesh binding; ignoring"
            );
            return Ok(None);
        }

        let model = initial_model(world, entity);
        let aggregator = world.resource_mut::<MeshAggregator>()?;
        let instance = aggregator.add_instance(self.mesh, PerInstanceRecord::new(model, textures))?;

        let binding = Self {
            mesh: self.mesh,
            instance,
        };
        world.insert(entity, binding)?;
        Ok(Some(binding))
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn is_master(&self) -> bool {
        self.instance == 0
    }
}

/// Transformがあればその行列、なければ単位行列
fn initial_model(world: &World, entity: EntityId) -> Mat4 {
    world
        .get::<Transform>(entity)
        .map(Transform::to_matrix)
        .unwrap_or(Mat4::IDENTITY)
}
