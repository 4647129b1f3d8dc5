//! Transformの変更をインスタンスバッファへ伝えるシステム

use engine_core::{EcsError, System, Transform, World};

use crate::aggregator::MeshAggregator;
use crate::error::RenderError;
use crate::sync::{InstanceMessage, InstanceSyncQueue};
use crate::task::FrameTasks;

/// 変更されたTransformを集めて同期キューに流すシステム
///
/// 必要なもの: `Transform`と`MeshBinding`の登録、`MeshAggregator`リソース。
/// `FrameTasks`リソースがなければ作る。
#[derive(Debug, Default)]
pub struct TransformSystem {
    queue: InstanceSyncQueue,
}

impl TransformSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &InstanceSyncQueue {
        &self.queue
    }

    /// 他のシステムから直接メッセージを積むためのキュー
    pub fn queue_mut(&mut self) -> &mut InstanceSyncQueue {
        &mut self.queue
    }
}

impl System for TransformSystem {
    fn update(&mut self, world: &mut World) -> Result<(), EcsError> {
        for (_, transform) in world.store_mut::<Transform>()?.iter_mut() {
            if let Some((entity, model)) = transform.take_change() {
                self.queue.enqueue(InstanceMessage::TransformChanged { entity, model });
            }
        }

        self.queue
            .process(world)
            .map_err(RenderError::into_system_error::<Self>)?;

        let mut tasks = world.remove_resource::<FrameTasks>().unwrap_or_default();
        let flushed = world
            .resource::<MeshAggregator>()
            .map(|aggregator| self.queue.flush(aggregator, &mut tasks));
        world.insert_resource(tasks);
        flushed?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::binding::MeshBinding;
    use crate::instance::{PerInstanceRecord, TextureBinding};
    use crate::mesh::Mesh;
    use glam::{Mat4, Vec3};

    #[test]
    fn test_changed_transform_reaches_instance_buffer() {
        let mut world = World::new();
        world.register_component::<Transform>();
        world.register_component::<MeshBinding>();
        let mut aggregator = MeshAggregator::default();
        let group = aggregator.create_draw_group("opaque");
        world.insert_resource(aggregator);

        let entity = world.spawn();
        world.insert(entity, Transform::identity()).unwrap();
        let binding =
            MeshBinding::create_master(&mut world, entity, group, Mesh::cube(), "cube", TextureBinding::default())
                .unwrap();

        let mut backend = HeadlessBackend::new();
        let mut tasks = FrameTasks::new();
        let aggregator = world.resource_mut::<MeshAggregator>().unwrap();
        aggregator.build(group).unwrap();
        aggregator.upload(group, &mut backend, &mut tasks).unwrap();
        world.insert_resource(tasks);

        let mut system = TransformSystem::new();
        world
            .get_mut::<Transform>(entity)
            .unwrap()
            .set_position(Vec3::new(2.0, 0.0, 0.0));
        system.update(&mut world).unwrap();

        assert_eq!(system.queue().dirty_count(), 0);
        let tasks = world.resource_mut::<FrameTasks>().unwrap();
        // アップロード + インスタンス同期
        assert_eq!(tasks.len(), 2);
        tasks.execute(&mut backend);

        let aggregator = world.resource::<MeshAggregator>().unwrap();
        let buffers = aggregator.draw_group(group).unwrap().buffers().unwrap();
        let records = backend.read::<PerInstanceRecord>(buffers.instance).unwrap();
        let expected = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(records[0].model_matrix(), expected);
        assert_eq!(
            aggregator.mesh(binding.mesh()).unwrap().instance_data()[0].model_matrix(),
            expected
        );
    }

    #[test]
    fn test_unchanged_transforms_produce_no_work() {
        let mut world = World::new();
        world.register_component::<Transform>();
        world.register_component::<MeshBinding>();
        world.insert_resource(MeshAggregator::default());
        let entity = world.spawn();
        world.insert(entity, Transform::identity()).unwrap();

        let mut system = TransformSystem::new();
        system.update(&mut world).unwrap();
        system.update(&mut world).unwrap();

        assert!(world.resource::<FrameTasks>().unwrap().is_empty());
        assert!(!world.get::<Transform>(entity).unwrap().is_changed());
    }

    #[test]
    fn test_requires_transform_registration() {
        let mut world = World::new();
        world.insert_resource(MeshAggregator::default());

        let mut system = TransformSystem::new();
        assert!(matches!(
            system.update(&mut world),
            Err(EcsError::UnregisteredComponent { .. })
        ));
    }
}
