//! wgpuバックエンド
//!
//! Device/Queueはアプリケーション側で作成して渡す（デバイスの寿命管理はここでは扱わない）。

use std::collections::HashMap;

use super::{BufferDesc, BufferHandle, BufferKind, ResourceBackend};
use crate::draw_group::{DrawCommand, DrawGroup};

/// 用途ごとのwgpu使用フラグ
fn usages(kind: BufferKind) -> wgpu::BufferUsages {
    use wgpu::BufferUsages as U;
    match kind {
        BufferKind::Vertex => U::VERTEX | U::STORAGE | U::COPY_DST,
        BufferKind::Index => U::INDEX | U::COPY_DST,
        BufferKind::Instance => U::VERTEX | U::STORAGE | U::COPY_DST,
        BufferKind::Indirect => U::INDIRECT | U::STORAGE | U::COPY_DST,
        BufferKind::Staging => U::COPY_SRC | U::COPY_DST,
    }
}

/// wgpuのDevice/Queueを使うバックエンド
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    next_id: u32,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// ハンドルに対応するwgpuバッファ
    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle)
    }

    /// 描画グループを1回の間接マルチドローで描画する
    /// パイプラインとバインドグループは呼び出し側で設定済みであること
    ///
    /// 頂点バッファはスロット0、インスタンスバッファはスロット1に割り当てる。
    /// `MULTI_DRAW_INDIRECT`機能が必要。
    pub fn draw_group(&self, pass: &mut wgpu::RenderPass<'_>, group: &DrawGroup) {
        let command_count = group.indirect_commands().len() as u32;
        let Some(buffers) = group.buffers() else {
            tracing::warn!(group = %group.name(), "draw group drawn before upload");
            return;
        };
        if command_count == 0 {
            return;
        }

        let (Some(vertex), Some(index), Some(instance), Some(commands)) = (
            self.buffer(buffers.vertex),
            self.buffer(buffers.index),
            self.buffer(buffers.instance),
            self.buffer(buffers.commands),
        ) else {
            tracing::error!(group = %group.name(), "draw group buffers are not owned by this backend");
            return;
        };

        pass.set_vertex_buffer(0, vertex.slice(..));
        pass.set_vertex_buffer(1, instance.slice(..));
        pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
        pass.multi_draw_indexed_indirect(commands, 0, command_count);
    }
}

impl ResourceBackend for WgpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferHandle {
        self.next_id += 1;
        let handle = BufferHandle(self.next_id);

        // wgpuは4バイト境界のサイズを要求する
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: usages(desc.kind),
            mapped_at_creation: false,
        });

        self.buffers.insert(handle, buffer);
        handle
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.buffers.get(&buffer) {
            Some(target) => self.queue.write_buffer(target, offset, data),
            None => tracing::error!(?buffer, "write to unknown buffer"),
        }
    }

    fn copy_buffer_region(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        if size == 0 {
            return;
        }
        let (Some(source), Some(target)) = (self.buffers.get(&src), self.buffers.get(&dst)) else {
            tracing::error!(?src, ?dst, "copy between unknown buffers");
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Buffer Copy Encoder"),
            });
        encoder.copy_buffer_to_buffer(
            source,
            0,
            target,
            0,
            size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// wgpuの間接描画引数へ変換
impl From<DrawCommand> for wgpu::util::DrawIndexedIndirectArgs {
    fn from(command: DrawCommand) -> Self {
        Self {
            index_count: command.index_count,
            instance_count: command.instance_count,
            first_index: command.first_index,
            base_vertex: command.vertex_offset,
            first_instance: command.first_instance,
        }
    }
}
