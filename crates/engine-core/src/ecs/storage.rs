use std::collections::HashMap;

use super::component::Component;
use super::entity::EntityId;

/// 密配列ベースのコンポーネントストア
/// - dense: 実際のデータ配列（連続メモリでキャッシュ効率が良い）
/// - entity_to_index: EntityId -> denseのインデックスへのマッピング
/// - index_to_entity: denseと対応するEntityIdの配列（逆引き・イテレーション用）
///
/// 削除時は末尾要素と交換するため、要素の位置は変わりうる。
/// 取得した参照を`insert`/`remove`を跨いで保持してはならない（借用規則で保証される）。
pub struct ComponentStore<T: Component> {
    dense: Vec<T>,
    entity_to_index: HashMap<EntityId, usize>,
    index_to_entity: Vec<EntityId>,
}

impl<T: Component> ComponentStore<T> {
    /// 新しいストアを作成
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entity_to_index: HashMap::new(),
            index_to_entity: Vec::new(),
        }
    }

    /// コンポーネントを追加（既存の場合はその位置で上書き）
    /// 格納後にattachフックを呼ぶ
    pub fn insert(&mut self, entity: EntityId, component: T) {
        let dense_index = match self.entity_to_index.get(&entity) {
            Some(&dense_index) => {
                self.dense[dense_index] = component;
                dense_index
            }
            None => {
                let dense_index = self.dense.len();
                self.dense.push(component);
                self.index_to_entity.push(entity);
                self.entity_to_index.insert(entity, dense_index);
                dense_index
            }
        };

        self.dense[dense_index].on_attach(entity);
    }

    /// コンポーネントを取得（不変参照）
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.entity_to_index
            .get(&entity)
            .map(|&dense_index| &self.dense[dense_index])
    }

    /// コンポーネントを取得（可変参照）
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entity_to_index
            .get(&entity)
            .map(|&dense_index| &mut self.dense[dense_index])
    }

    /// コンポーネントを削除
    /// 存在しない場合は警告を出して何もしない
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let Some(dense_index) = self.entity_to_index.remove(&entity) else {
            tracing::warn!(
                %entity,
                component = std::any::type_name::<T>(),
                "trying to remove nonexistent component from entity"
            );
            return None;
        };

        Some(self.swap_remove_at(dense_index))
    }

    /// 警告なしで削除（despawn用）
    pub(crate) fn remove_silently(&mut self, entity: EntityId) -> Option<T> {
        let dense_index = self.entity_to_index.remove(&entity)?;
        Some(self.swap_remove_at(dense_index))
    }

    /// 最後の要素と交換して削除（O(1)削除）
    fn swap_remove_at(&mut self, dense_index: usize) -> T {
        let last_index = self.dense.len() - 1;
        if dense_index != last_index {
            // 移動する末尾要素のマッピングを更新
            let last_entity = self.index_to_entity[last_index];
            self.entity_to_index.insert(last_entity, dense_index);
        }

        self.index_to_entity.swap_remove(dense_index);
        self.dense.swap_remove(dense_index)
    }

    /// 密配列を直接参照（一括イテレーション用）
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// 密配列を直接参照（可変）
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// denseと並行するEntity配列
    pub fn entities(&self) -> &[EntityId] {
        &self.index_to_entity
    }

    /// 全コンポーネントをイテレート
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.index_to_entity.iter().copied().zip(self.dense.iter())
    }

    /// 全コンポーネントを可変イテレート
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.index_to_entity.iter().copied().zip(self.dense.iter_mut())
    }

    /// ストア内のコンポーネント数
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// ストアが空かどうか
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// 指定Entityがコンポーネントを持つか
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entity_to_index.contains_key(&entity)
    }

    /// 内部の対応関係が壊れていないか検査（テスト・デバッグ用）
    pub fn is_consistent(&self) -> bool {
        self.dense.len() == self.entity_to_index.len()
            && self.dense.len() == self.index_to_entity.len()
            && self
                .index_to_entity
                .iter()
                .enumerate()
                .all(|(i, entity)| self.entity_to_index.get(entity) == Some(&i))
    }
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
