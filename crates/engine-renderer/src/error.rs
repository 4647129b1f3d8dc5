//! レンダラ層のエラー型

use engine_core::EcsError;
use thiserror::Error;

use crate::aggregator::MeshHandle;
use crate::draw_group::DrawGroupId;

/// 集約・アップロード・同期で発生しうるエラー
///
/// いずれも現在のビルド/登録処理を中断させる契約違反。
/// 回復可能な誤用（非マスターからのインスタンス化など）はエラーにせず警告ログで済ませる。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// インスタンス数が描画グループの容量を超えた
    #[error("draw group `{group}` instance count exceeded: {requested} > {capacity}; bind fewer instances or raise max_instances_per_group")]
    InstanceCapacityExceeded {
        group: String,
        requested: u32,
        capacity: u32,
    },

    /// メッシュ数が描画グループの容量を超えた
    #[error("draw group `{group}` mesh count exceeded: {requested} > {capacity}")]
    MeshCapacityExceeded {
        group: String,
        requested: u32,
        capacity: u32,
    },

    /// 頂点・インデックスの総数が間接描画コマンドで表せる範囲を超えた
    #[error("draw group `{group}` {kind} count out of range: {requested}")]
    GeometryCapacityExceeded {
        group: String,
        kind: &'static str,
        requested: u64,
    },

    /// 存在しないメッシュハンドル
    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),

    /// 存在しない描画グループ
    #[error("unknown draw group {0:?}")]
    UnknownDrawGroup(DrawGroupId),

    /// メッシュは既に別の描画グループに登録済み
    #[error("mesh {mesh:?} already belongs to draw group {group:?}")]
    MeshAlreadyGrouped { mesh: MeshHandle, group: DrawGroupId },

    /// build前にuploadしようとした
    #[error("draw group `{0}` must be built before upload")]
    NotBuilt(String),

    /// 設定値が不正
    #[error("invalid configuration: {0}")]
    Config(String),

    /// ECS層のエラー
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

impl RenderError {
    /// システム`S`の失敗として`EcsError`へ変換する（ECS層のエラーはそのまま通す）
    pub fn into_system_error<S: 'static>(self) -> EcsError {
        match self {
            RenderError::Ecs(inner) => inner,
            other => EcsError::SystemFailed {
                system: std::any::type_name::<S>(),
                reason: other.to_string(),
            },
        }
    }
}
