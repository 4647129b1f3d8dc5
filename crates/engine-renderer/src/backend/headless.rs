//! ホストメモリ上のバックエンド
//!
//! GPUなしで集約・同期の結果を検証するために、全バッファをVec<u8>で持ち、
//! 発行された操作をすべて記録する。

use std::collections::HashMap;

use bytemuck::Pod;

use super::{BufferDesc, BufferHandle, BufferKind, ResourceBackend};

/// 記録された操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    Create { buffer: BufferHandle, kind: BufferKind, size: u64 },
    Destroy { buffer: BufferHandle },
    Write { buffer: BufferHandle, offset: u64, len: u64 },
    Copy { src: BufferHandle, dst: BufferHandle, size: u64 },
}

#[derive(Debug)]
struct HostBuffer {
    label: String,
    kind: BufferKind,
    bytes: Vec<u8>,
}

/// ホストメモリバックエンド
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    buffers: HashMap<BufferHandle, HostBuffer>,
    ops: Vec<BackendOp>,
    next_id: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// バッファの内容
    pub fn bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.bytes.as_slice())
    }

    /// バッファの内容を型付きで読み出す
    pub fn read<T: Pod>(&self, buffer: BufferHandle) -> Option<Vec<T>> {
        let bytes = self.bytes(buffer)?;
        Some(
            bytes
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned)
                .collect(),
        )
    }

    pub fn label(&self, buffer: BufferHandle) -> Option<&str> {
        self.buffers.get(&buffer).map(|b| b.label.as_str())
    }

    pub fn kind(&self, buffer: BufferHandle) -> Option<BufferKind> {
        self.buffers.get(&buffer).map(|b| b.kind)
    }

    /// 生存中のバッファ数
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// 記録された全操作
    pub fn ops(&self) -> &[BackendOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// 指定バッファへの書き込み回数
    pub fn write_count(&self, buffer: BufferHandle) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BackendOp::Write { buffer: b, .. } if *b == buffer))
            .count()
    }
}

impl ResourceBackend for HeadlessBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferHandle {
        self.next_id += 1;
        let buffer = BufferHandle(self.next_id);
        self.buffers.insert(
            buffer,
            HostBuffer {
                label: desc.label.to_string(),
                kind: desc.kind,
                bytes: vec![0; desc.size as usize],
            },
        );
        self.ops.push(BackendOp::Create {
            buffer,
            kind: desc.kind,
            size: desc.size,
        });
        buffer
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.ops.push(BackendOp::Destroy { buffer });
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(target) = self.buffers.get_mut(&buffer) else {
            tracing::error!(?buffer, "write to unknown buffer");
            return;
        };

        let start = offset as usize;
        let end = start + data.len();
        if end > target.bytes.len() {
            tracing::error!(
                label = %target.label,
                offset,
                len = data.len(),
                size = target.bytes.len(),
                "write out of buffer bounds"
            );
            return;
        }

        target.bytes[start..end].copy_from_slice(data);
        self.ops.push(BackendOp::Write {
            buffer,
            offset,
            len: data.len() as u64,
        });
    }

    fn copy_buffer_region(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        let Some(source) = self.buffers.get(&src) else {
            tracing::error!(?src, "copy from unknown buffer");
            return;
        };
        let size_bytes = size as usize;
        if size_bytes > source.bytes.len() {
            tracing::error!(label = %source.label, size, "copy larger than source buffer");
            return;
        }
        let data = source.bytes[..size_bytes].to_vec();

        let Some(target) = self.buffers.get_mut(&dst) else {
            tracing::error!(?dst, "copy into unknown buffer");
            return;
        };
        if size_bytes > target.bytes.len() {
            tracing::error!(label = %target.label, size, "copy larger than destination buffer");
            return;
        }

        target.bytes[..size_bytes].copy_from_slice(&data);
        self.ops.push(BackendOp::Copy { src, dst, size });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(label: &str, size: u64, kind: BufferKind) -> BufferDesc<'_> {
        BufferDesc { label, size, kind }
    }

    #[test]
    fn test_create_write_read() {
        let mut backend = HeadlessBackend::new();
        let buffer = backend.create_buffer(&desc("values", 16, BufferKind::Vertex));

        backend.write_buffer(buffer, 4, bytemuck::cast_slice(&[7u32, 8u32]));

        assert_eq!(backend.read::<u32>(buffer).unwrap(), vec![0, 7, 8, 0]);
        assert_eq!(backend.label(buffer), Some("values"));
        assert_eq!(backend.kind(buffer), Some(BufferKind::Vertex));
        assert_eq!(backend.write_count(buffer), 1);
    }

    #[test]
    fn test_out_of_bounds_write_is_rejected() {
        let mut backend = HeadlessBackend::new();
        let buffer = backend.create_buffer(&desc("small", 4, BufferKind::Index));

        backend.write_buffer(buffer, 2, &[1, 2, 3, 4]);

        assert_eq!(backend.bytes(buffer).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(backend.write_count(buffer), 0);
    }

    #[test]
    fn test_copy_and_destroy() {
        let mut backend = HeadlessBackend::new();
        let staging = backend.create_buffer(&desc("staging", 8, BufferKind::Staging));
        let dst = backend.create_buffer(&desc("dst", 12, BufferKind::Index));

        backend.write_buffer(staging, 0, bytemuck::cast_slice(&[1u32, 2u32]));
        backend.copy_buffer_region(staging, dst, 8);
        backend.destroy_buffer(staging);

        assert_eq!(backend.read::<u32>(dst).unwrap(), vec![1, 2, 0]);
        assert_eq!(backend.live_buffers(), 1);
        assert_eq!(backend.ops().last(), Some(&BackendOp::Destroy { buffer: staging }));
    }
}
