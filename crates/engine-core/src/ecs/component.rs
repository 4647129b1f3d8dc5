use super::entity::EntityId;

/// 全コンポーネントが実装すべきトレイト
/// - `'static`: コンポーネントは参照を持たない（他Entityへの参照はEntityIdで持つ）
/// - `Send + Sync`: 将来のマルチスレッド対応
pub trait Component: 'static + Send + Sync {
    /// ストア上の最終位置に格納された直後に呼ばれるフック
    /// 既存コンポーネントの上書き時にも再度呼ばれる
    fn on_attach(&mut self, _entity: EntityId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Tagged {
        owner: Option<EntityId>,
    }

    impl Component for Tagged {
        fn on_attach(&mut self, entity: EntityId) {
            self.owner = Some(entity);
        }
    }

    #[derive(Debug, PartialEq)]
    struct Plain(i32);

    impl Component for Plain {}

    #[test]
    fn test_on_attach_hook() {
        let entity = EntityId::new(3).unwrap();
        let mut comp = Tagged::default();
        comp.on_attach(entity);
        assert_eq!(comp.owner, Some(entity));
    }

    #[test]
    fn test_default_hook_is_noop() {
        let mut comp = Plain(5);
        comp.on_attach(EntityId::new(1).unwrap());
        assert_eq!(comp, Plain(5));
    }
}
