//! リソースバックエンド
//!
//! GPUバッファの生成・破棄・書き込み・コピーだけを切り出した境界。
//! 集約器と同期キューはこのトレイト越しにしかデバイスへ触れない。

pub mod headless;
pub mod wgpu_backend;

pub use headless::{BackendOp, HeadlessBackend};
pub use wgpu_backend::WgpuBackend;

/// バックエンドが発行する不透明なバッファハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferHandle(pub(crate) u32);

impl BufferHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// バッファの用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// 集約頂点バッファ
    Vertex,
    /// 集約インデックスバッファ
    Index,
    /// 集約インスタンスバッファ（ホストから毎フレーム書き込まれる）
    Instance,
    /// 間接描画コマンドバッファ
    Indirect,
    /// 一時的な転送元
    Staging,
}

/// バッファ生成の記述子
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub kind: BufferKind,
}

/// GPUリソース管理の最小インターフェース
pub trait ResourceBackend {
    /// バッファを生成
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferHandle;

    /// バッファを破棄（未知のハンドルは無視）
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// ホストからバッファへ書き込む（マップ書き込み相当）
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// バッファ間で先頭から`size`バイトをコピー
    fn copy_buffer_region(&mut self, src: BufferHandle, dst: BufferHandle, size: u64);
}
