//! 描画グループ
//!
//! 同じパイプラインで描くメッシュの集合。`MeshAggregator::build`で
//! 頂点・インデックス・インスタンスを1本ずつのバッファに並べ、
//! メッシュごとの間接描画コマンドを作る。

use bytemuck::{Pod, Zeroable};

use crate::aggregator::MeshHandle;
use crate::backend::BufferHandle;
use crate::instance::PerInstanceRecord;
use crate::mesh::Vertex;

/// 描画グループID（集約器内のインデックス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawGroupId(pub(crate) u32);

impl DrawGroupId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// 間接描画コマンド1件分（`multi_draw_indexed_indirect`の引数レイアウト）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawCommand {
    /// バイトサイズ
    pub const SIZE: u64 = std::mem::size_of::<DrawCommand>() as u64;
}

/// レイアウトの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// 一度もビルドされていない
    Empty,
    /// ビルド後にメッシュ/インスタンスが追加された
    Stale,
    /// オフセットとコマンドが確定している
    Built,
    /// GPUバッファへ転送済み
    Uploaded,
}

/// 描画グループが持つGPUバッファ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupBuffers {
    pub vertex: BufferHandle,
    pub index: BufferHandle,
    pub instance: BufferHandle,
    pub commands: BufferHandle,
}

impl GroupBuffers {
    pub fn all(&self) -> [BufferHandle; 4] {
        [self.vertex, self.index, self.instance, self.commands]
    }
}

/// build時に作られる転送用の連結データ
#[derive(Debug, Clone, Default)]
pub(crate) struct StagingData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub instances: Vec<PerInstanceRecord>,
}

/// 描画グループ
#[derive(Debug)]
pub struct DrawGroup {
    id: DrawGroupId,
    name: String,
    pub(crate) meshes: Vec<MeshHandle>,
    pub(crate) total_vertex_count: u32,
    pub(crate) total_index_count: u32,
    pub(crate) total_instance_count: u32,
    pub(crate) indirect_commands: Vec<DrawCommand>,
    pub(crate) state: LayoutState,
    pub(crate) staging: Option<StagingData>,
    pub(crate) buffers: Option<GroupBuffers>,
}

impl DrawGroup {
    pub(crate) fn new(id: DrawGroupId, name: String) -> Self {
        Self {
            id,
            name,
            meshes: Vec::new(),
            total_vertex_count: 0,
            total_index_count: 0,
            total_instance_count: 0,
            indirect_commands: Vec::new(),
            state: LayoutState::Empty,
            staging: None,
            buffers: None,
        }
    }

    pub fn id(&self) -> DrawGroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 登録順のメッシュ
    pub fn meshes(&self) -> &[MeshHandle] {
        &self.meshes
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn total_vertex_count(&self) -> u32 {
        self.total_vertex_count
    }

    pub fn total_index_count(&self) -> u32 {
        self.total_index_count
    }

    pub fn total_instance_count(&self) -> u32 {
        self.total_instance_count
    }

    /// メッシュ登録順の間接描画コマンド
    pub fn indirect_commands(&self) -> &[DrawCommand] {
        &self.indirect_commands
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// アップロード済みならGPUバッファ
    pub fn buffers(&self) -> Option<GroupBuffers> {
        self.buffers
    }

    pub fn is_uploaded(&self) -> bool {
        self.state == LayoutState::Uploaded
    }

    /// レイアウトを無効化する（次のbuildで作り直す）
    pub(crate) fn mark_stale(&mut self) {
        if matches!(self.state, LayoutState::Built | LayoutState::Uploaded) {
            tracing::debug!(group = %self.name, "draw group layout invalidated");
            self.state = LayoutState::Stale;
        }
    }
}
