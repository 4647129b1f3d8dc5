//! インスタンス同期キュー
//!
//! 1フレームの流れ:
//! 1. `enqueue` 更新メッセージを積む（何度でも）
//! 2. `process` 積まれた順にメモリ上のインスタンスレコードへ反映し、メッシュを汚れ集合へ
//! 3. `flush` 汚れたメッシュごとに1回だけインスタンスバッファへの書き込みタスクを登録
//!
//! 同じエンティティへの複数メッセージは後勝ち。

use std::collections::{BTreeSet, VecDeque};

use engine_core::{EntityId, World};
use glam::Mat4;

use crate::aggregator::{MeshAggregator, MeshHandle};
use crate::binding::MeshBinding;
use crate::error::RenderError;
use crate::task::{BufferAccess, FrameTasks, GpuTask};

/// インスタンス更新メッセージ
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstanceMessage {
    /// エンティティのモデル行列が変わった
    TransformChanged { entity: EntityId, model: Mat4 },
}

#[derive(Debug, Default)]
pub struct InstanceSyncQueue {
    messages: VecDeque<InstanceMessage>,
    dirty: BTreeSet<MeshHandle>,
}

impl InstanceSyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, message: InstanceMessage) {
        self.messages.push_back(message);
    }

    /// 未処理のメッセージ数
    pub fn pending(&self) -> usize {
        self.messages.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_dirty(&self, mesh: MeshHandle) -> bool {
        self.dirty.contains(&mesh)
    }

    /// メッセージを順に適用する。適用した件数を返す
    ///
    /// バインディングを持たないエンティティ宛てのメッセージは読み捨てる。
    pub fn process(&mut self, world: &mut World) -> Result<usize, RenderError> {
        // 途中で失敗してメッセージを失わないよう先に確認しておく
        world.resource::<MeshAggregator>()?;
        world.store::<MeshBinding>()?;

        let mut applied = 0;
        while let Some(message) = self.messages.pop_front() {
            match message {
                InstanceMessage::TransformChanged { entity, model } => {
                    let Some(binding) = world.get::<MeshBinding>(entity).copied() else {
                        tracing::debug!(%entity, "no mesh binding; transform change skipped");
                        continue;
                    };

                    let aggregator = world.resource_mut::<MeshAggregator>()?;
                    let Some(record) = aggregator.instance_record_mut(binding.mesh(), binding.instance()) else {
                        tracing::warn!(
                            %entity,
                            mesh = binding.mesh().raw(),
                            instance = binding.instance(),
                            "mesh binding points at a missing instance"
                        );
                        continue;
                    };
                    record.set_model_matrix(model);
                    self.dirty.insert(binding.mesh());
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    /// 汚れたメッシュのインスタンスデータを書き込むタスクを登録し、汚れ集合を空にする
    ///
    /// 未アップロード・レイアウトが古いグループのメッシュは次のuploadで書き込まれるので飛ばす。
    /// 登録したタスク数を返す。
    pub fn flush(&mut self, aggregator: &MeshAggregator, tasks: &mut FrameTasks) -> usize {
        let mut written = 0;
        for mesh in std::mem::take(&mut self.dirty) {
            let Some(resource) = aggregator.mesh(mesh) else {
                tracing::warn!(mesh = mesh.raw(), "dirty mesh no longer exists");
                continue;
            };
            let Some((buffer, offset)) = aggregator.instance_target(mesh) else {
                tracing::warn!(
                    mesh = %resource.label(),
                    "draw group not uploaded or layout stale; instance write deferred to next upload"
                );
                continue;
            };

            let bytes: Vec<u8> = bytemuck::cast_slice(resource.instance_data()).to_vec();
            let access = BufferAccess::write(buffer, offset, bytes.len() as u64);
            tasks.add_task(GpuTask::new(
                format!("sync instances {}", resource.label()),
                vec![access],
                move |backend| backend.write_buffer(buffer, offset, &bytes),
            ));
            written += 1;
        }

        if written > 0 {
            tracing::debug!(meshes = written, "instance writes registered");
        }
        written
    }
}
