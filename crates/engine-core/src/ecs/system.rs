use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::world::World;
use crate::error::EcsError;

/// 全システムが実装するトレイト
/// システムは型ごとに1インスタンスのみ存在する
///
/// 実行順は登録順だが、正しさをその順序に依存させてはならない。
/// 順序が必要な処理はメッセージキュー経由で表現する。
pub trait System: 'static {
    /// 1フレームに1回呼ばれる
    fn update(&mut self, world: &mut World) -> Result<(), EcsError>;
}

/// 型消去されたシステムのトレイト
trait AnySystem {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn run(&mut self, world: &mut World) -> Result<(), EcsError>;
}

impl<T: System> AnySystem for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn run(&mut self, world: &mut World) -> Result<(), EcsError> {
        self.update(world)
    }
}

/// システムの登録簿
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<Box<dyn AnySystem>>,
    index_of: HashMap<TypeId, usize>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// システムを登録
    /// 同じ型が既に登録されている場合は置き換える（実行順の位置は維持）
    pub fn register<T: System>(&mut self, system: T) {
        let type_id = TypeId::of::<T>();
        match self.index_of.get(&type_id) {
            Some(&index) => {
                tracing::warn!(
                    system = std::any::type_name::<T>(),
                    "system registered twice, replacing the previous instance"
                );
                self.systems[index] = Box::new(system);
            }
            None => {
                self.index_of.insert(type_id, self.systems.len());
                self.systems.push(Box::new(system));
            }
        }
    }

    /// システムを取得（不変）
    pub fn get<T: System>(&self) -> Result<&T, EcsError> {
        self.index_of
            .get(&TypeId::of::<T>())
            .and_then(|&index| self.systems[index].as_any().downcast_ref::<T>())
            .ok_or_else(EcsError::unregistered_system::<T>)
    }

    /// システムを取得（可変）
    pub fn get_mut<T: System>(&mut self) -> Result<&mut T, EcsError> {
        let index = *self
            .index_of
            .get(&TypeId::of::<T>())
            .ok_or_else(EcsError::unregistered_system::<T>)?;
        self.systems[index]
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(EcsError::unregistered_system::<T>)
    }

    /// 全システムの`update`を登録順に1回ずつ呼ぶ
    /// 最初に失敗したシステムのエラーを返す
    pub fn update_all(&mut self, world: &mut World) -> Result<(), EcsError> {
        for system in &mut self.systems {
            system.run(world)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// updateが呼ばれた回数を数えるシステム
    struct Counter {
        ticks: u32,
    }

    impl System for Counter {
        fn update(&mut self, _world: &mut World) -> Result<(), EcsError> {
            self.ticks += 1;
            Ok(())
        }
    }

    /// Worldのリソースに書き込むシステム
    struct Writer;

    impl System for Writer {
        fn update(&mut self, world: &mut World) -> Result<(), EcsError> {
            *world.resource_mut::<u32>()? += 10;
            Ok(())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut systems = SystemRegistry::new();
        systems.register(Counter { ticks: 0 });

        assert_eq!(systems.get::<Counter>().unwrap().ticks, 0);
        systems.get_mut::<Counter>().unwrap().ticks = 3;
        assert_eq!(systems.get::<Counter>().unwrap().ticks, 3);
    }

    #[test]
    fn test_get_unregistered_is_an_error() {
        let systems = SystemRegistry::new();
        assert!(matches!(
            systems.get::<Counter>(),
            Err(EcsError::UnregisteredSystem { .. })
        ));
    }

    #[test]
    fn test_register_twice_keeps_single_instance() {
        let mut systems = SystemRegistry::new();
        systems.register(Counter { ticks: 1 });
        systems.register(Counter { ticks: 5 });

        assert_eq!(systems.len(), 1);
        assert_eq!(systems.get::<Counter>().unwrap().ticks, 5);
    }

    #[test]
    fn test_update_all_calls_each_once() {
        let mut world = World::new();
        world.insert_resource(0u32);

        let mut systems = SystemRegistry::new();
        systems.register(Counter { ticks: 0 });
        systems.register(Writer);

        systems.update_all(&mut world).unwrap();
        systems.update_all(&mut world).unwrap();

        assert_eq!(systems.get::<Counter>().unwrap().ticks, 2);
        assert_eq!(*world.resource::<u32>().unwrap(), 20);
    }

    #[test]
    fn test_update_all_surfaces_errors() {
        let mut world = World::new();
        let mut systems = SystemRegistry::new();
        systems.register(Writer);

        let err = systems.update_all(&mut world).unwrap_err();
        assert!(matches!(err, EcsError::MissingResource { .. }));
    }
}
