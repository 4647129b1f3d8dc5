use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::Component;
use super::entity::{EntityAllocator, EntityId};
use super::registry::ComponentRegistry;
use super::storage::ComponentStore;
use crate::error::EcsError;

/// ECSのメインコンテナ
/// Entity発行器、コンポーネントストア、型ごとのリソースを保持する
///
/// グローバル状態は持たず、起動時に生成してシステムへ明示的に渡す。
pub struct World {
    /// Entity発行器
    entities: EntityAllocator,
    /// 型ごとのコンポーネントストア
    components: ComponentRegistry,
    /// 型ごとのリソース（レンダラの集約器など）
    resources: HashMap<TypeId, Box<dyn Any>>,
}

impl World {
    /// 新しいWorldを作成
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: ComponentRegistry::new(),
            resources: HashMap::new(),
        }
    }

    /// 新規Entityを生成
    pub fn spawn(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Entityを削除（全ストアからコンポーネントを取り除く）
    /// IDは再利用されない
    pub fn despawn(&mut self, entity: EntityId) {
        self.components.remove_entity(entity);
    }

    /// これまでに発行したEntity数
    pub fn spawned_count(&self) -> u32 {
        self.entities.issued()
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// コンポーネント型を登録（冪等）
    pub fn register_component<T: Component>(&mut self) {
        self.components.register::<T>();
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// 型に対応するストアを取得（未登録はエラー）
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, EcsError> {
        self.components.store::<T>()
    }

    /// 型に対応するストアを取得（可変、未登録はエラー）
    pub fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>, EcsError> {
        self.components.store_mut::<T>()
    }

    /// コンポーネントを追加
    pub fn insert<T: Component>(&mut self, entity: EntityId, component: T) -> Result<(), EcsError> {
        self.store_mut::<T>()?.insert(entity, component);
        Ok(())
    }

    /// コンポーネントを取得（不変参照）
    /// ストア未登録の場合もNoneを返す
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.components.store::<T>().ok()?.get(entity)
    }

    /// コンポーネントを取得（可変参照）
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.components.store_mut::<T>().ok()?.get_mut(entity)
    }

    /// コンポーネントを削除
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Result<Option<T>, EcsError> {
        Ok(self.store_mut::<T>()?.remove(entity))
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// リソースを追加（同じ型があれば置き換えて古い値を返す）
    pub fn insert_resource<R: 'static>(&mut self, resource: R) -> Option<R> {
        self.resources
            .insert(TypeId::of::<R>(), Box::new(resource))
            .and_then(|old| old.downcast::<R>().ok())
            .map(|old| *old)
    }

    /// リソースを取得
    pub fn resource<R: 'static>(&self) -> Result<&R, EcsError> {
        self.resources
            .get(&TypeId::of::<R>())
            .and_then(|resource| resource.downcast_ref::<R>())
            .ok_or_else(EcsError::missing_resource::<R>)
    }

    /// リソースを取得（可変）
    pub fn resource_mut<R: 'static>(&mut self) -> Result<&mut R, EcsError> {
        self.resources
            .get_mut(&TypeId::of::<R>())
            .and_then(|resource| resource.downcast_mut::<R>())
            .ok_or_else(EcsError::missing_resource::<R>)
    }

    /// リソースを取り除く
    pub fn remove_resource<R: 'static>(&mut self) -> Option<R> {
        self.resources
            .remove(&TypeId::of::<R>())
            .and_then(|resource| resource.downcast::<R>().ok())
            .map(|resource| *resource)
    }

    pub fn has_resource<R: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<R>())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[derive(Debug, PartialEq, Clone)]
    struct Velocity {
        x: f32,
        y: f32,
    }
    impl Component for Velocity {}

    #[derive(Debug, PartialEq)]
    struct FrameCounter(u64);

    fn world_with_components() -> World {
        let mut world = World::new();
        world.register_component::<Position>();
        world.register_component::<Velocity>();
        world
    }

    #[test]
    fn test_spawn_is_monotonic() {
        let mut world = World::new();
        let e1 = world.spawn();
        let e2 = world.spawn();

        assert_eq!(e1.to_u32(), 1);
        assert_eq!(e2.to_u32(), 2);
        assert_eq!(world.spawned_count(), 2);
    }

    #[test]
    fn test_despawn_does_not_reuse_ids() {
        let mut world = world_with_components();
        let e1 = world.spawn();
        world.insert(e1, Position { x: 1.0, y: 2.0 }).unwrap();

        world.despawn(e1);
        let e2 = world.spawn();

        assert_ne!(e1, e2);
        assert_eq!(world.get::<Position>(e1), None);
    }

    #[test]
    fn test_insert_and_get() {
        let mut world = world_with_components();
        let entity = world.spawn();

        world.insert(entity, Position { x: 1.0, y: 2.0 }).unwrap();

        assert_eq!(world.get::<Position>(entity), Some(&Position { x: 1.0, y: 2.0 }));
        assert_eq!(world.get::<Velocity>(entity), None);
    }

    #[test]
    fn test_insert_into_unregistered_store_fails() {
        let mut world = World::new();
        let entity = world.spawn();

        let err = world.insert(entity, Position { x: 0.0, y: 0.0 }).unwrap_err();
        assert!(matches!(err, EcsError::UnregisteredComponent { .. }));
        // 取得はNone（例外ではない）
        assert_eq!(world.get::<Position>(entity), None);
    }

    #[test]
    fn test_get_mut() {
        let mut world = world_with_components();
        let entity = world.spawn();
        world.insert(entity, Position { x: 1.0, y: 2.0 }).unwrap();

        if let Some(pos) = world.get_mut::<Position>(entity) {
            pos.x = 10.0;
        }

        assert_eq!(world.get::<Position>(entity), Some(&Position { x: 10.0, y: 2.0 }));
    }

    #[test]
    fn test_multiple_components() {
        let mut world = world_with_components();
        let entity = world.spawn();

        world.insert(entity, Position { x: 1.0, y: 2.0 }).unwrap();
        world.insert(entity, Velocity { x: 3.0, y: 4.0 }).unwrap();

        assert_eq!(world.get::<Position>(entity), Some(&Position { x: 1.0, y: 2.0 }));
        assert_eq!(world.get::<Velocity>(entity), Some(&Velocity { x: 3.0, y: 4.0 }));
    }

    #[test]
    fn test_remove_component() {
        let mut world = world_with_components();
        let entity = world.spawn();
        world.insert(entity, Position { x: 1.0, y: 2.0 }).unwrap();

        let removed = world.remove::<Position>(entity).unwrap();
        assert_eq!(removed, Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(world.get::<Position>(entity), None);

        // 2回目は警告のみ
        assert_eq!(world.remove::<Position>(entity).unwrap(), None);
    }

    #[test]
    fn test_resources() {
        let mut world = World::new();
        assert!(matches!(
            world.resource::<FrameCounter>(),
            Err(EcsError::MissingResource { .. })
        ));

        assert_eq!(world.insert_resource(FrameCounter(0)), None);
        world.resource_mut::<FrameCounter>().unwrap().0 += 1;
        assert_eq!(world.resource::<FrameCounter>().unwrap(), &FrameCounter(1));

        let old = world.insert_resource(FrameCounter(9));
        assert_eq!(old, Some(FrameCounter(1)));

        assert_eq!(world.remove_resource::<FrameCounter>(), Some(FrameCounter(9)));
        assert!(!world.has_resource::<FrameCounter>());
    }
}
