use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::Component;
use super::entity::EntityId;
use super::storage::ComponentStore;
use crate::error::EcsError;

/// 型消去されたストアのトレイト
trait AnyStore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove_entity(&mut self, entity: EntityId);
    fn len(&self) -> usize;
}

impl<T: Component> AnyStore for ComponentStore<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn remove_entity(&mut self, entity: EntityId) {
        self.remove_silently(entity);
    }
    fn len(&self) -> usize {
        ComponentStore::len(self)
    }
}

/// 型ごとのコンポーネントストアの集合
/// ストアはセットアップ時に明示的に登録する
#[derive(Default)]
pub struct ComponentRegistry {
    stores: HashMap<TypeId, Box<dyn AnyStore>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// ストアを登録（既に登録済みなら何もしない）
    pub fn register<T: Component>(&mut self) {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStore::<T>::new()));
    }

    /// 登録済みかどうか
    pub fn is_registered<T: Component>(&self) -> bool {
        self.stores.contains_key(&TypeId::of::<T>())
    }

    /// 型に対応するストアを取得（不変）
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, EcsError> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|store| store.as_any().downcast_ref::<ComponentStore<T>>())
            .ok_or_else(EcsError::unregistered_component::<T>)
    }

    /// 型に対応するストアを取得（可変）
    pub fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>, EcsError> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .ok_or_else(EcsError::unregistered_component::<T>)
    }

    /// 全ストアから指定Entityのコンポーネントを削除
    pub fn remove_entity(&mut self, entity: EntityId) {
        for store in self.stores.values_mut() {
            store.remove_entity(entity);
        }
    }

    /// 登録されているストア数
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// 全ストアのコンポーネント総数
    pub fn component_count(&self) -> usize {
        self.stores.values().map(|store| store.len()).sum()
    }
}
