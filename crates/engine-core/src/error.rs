//! ECS層のエラー型
//!
//! いずれもセットアップ時の契約違反（登録漏れなど）を表す。
//! 実行時に回復すべき状態ではないため、呼び出し元へ`?`で伝播させる。

use thiserror::Error;

/// ECS操作で発生しうるエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// 未登録のコンポーネント型のストアにアクセスした
    #[error("component store not registered: {type_name}")]
    UnregisteredComponent {
        /// コンポーネント型名
        type_name: &'static str,
    },

    /// 未登録のシステム型にアクセスした
    #[error("system not registered: {type_name}")]
    UnregisteredSystem {
        /// システム型名
        type_name: &'static str,
    },

    /// Worldに存在しないリソースにアクセスした
    #[error("resource not found in world: {type_name}")]
    MissingResource {
        /// リソース型名
        type_name: &'static str,
    },

    /// システム固有の失敗（下位層のエラーを文字列化したもの）
    #[error("system `{system}` failed: {reason}")]
    SystemFailed {
        /// システム型名
        system: &'static str,
        /// 失敗理由
        reason: String,
    },
}

impl EcsError {
    pub fn unregistered_component<T: 'static>() -> Self {
        Self::UnregisteredComponent {
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn unregistered_system<T: 'static>() -> Self {
        Self::UnregisteredSystem {
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn missing_resource<T: 'static>() -> Self {
        Self::MissingResource {
            type_name: std::any::type_name::<T>(),
        }
    }
}
