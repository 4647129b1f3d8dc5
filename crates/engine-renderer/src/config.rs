//! 集約器の設定
//!
//! 容量はバッファサイズを決めるため、描画グループ作成前に確定させる。

use serde::Deserialize;

use crate::error::RenderError;

/// 1描画グループあたりの最大インスタンス数（インスタンスバッファのサイズを決める）
pub const MAX_DRAWGROUP_INSTANCE_COUNT: u32 = 1024;

/// 1描画グループあたりの最大メッシュ数（間接描画コマンドバッファのサイズを決める）
pub const MAX_DRAWGROUP_MESH_COUNT: u32 = 1024;

/// 集約器の容量設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub max_instances_per_group: u32,
    pub max_meshes_per_group: u32,
}

impl AggregatorConfig {
    /// JSON文字列から読み込む（省略したフィールドは既定値）
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.max_instances_per_group == 0 {
            return Err(RenderError::Config(
                "max_instances_per_group must be at least 1".to_string(),
            ));
        }
        if self.max_meshes_per_group == 0 {
            return Err(RenderError::Config(
                "max_meshes_per_group must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_instances_per_group: MAX_DRAWGROUP_INSTANCE_COUNT,
            max_meshes_per_group: MAX_DRAWGROUP_MESH_COUNT,
        }
    }
}
