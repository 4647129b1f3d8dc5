//! メッシュ集約器
//!
//! すべての`MeshResource`と`DrawGroup`を所有する。
//! 他の場所（コンポーネント、描画グループ、同期キュー）は`MeshHandle`だけを持つ。

use crate::backend::{BufferDesc, BufferHandle, BufferKind, ResourceBackend};
use crate::config::AggregatorConfig;
use crate::draw_group::{DrawCommand, DrawGroup, DrawGroupId, GroupBuffers, LayoutState, StagingData};
use crate::error::RenderError;
use crate::instance::PerInstanceRecord;
use crate::mesh::{Mesh, Vertex};
use crate::task::{BufferAccess, FrameTasks, GpuTask};

/// メッシュハンドル（集約器のアリーナのインデックス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshHandle(pub(crate) u32);

impl MeshHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// 集約対象のメッシュ
///
/// ジオメトリは生成後不変。インスタンスデータとオフセットだけが変化する。
#[derive(Debug)]
pub struct MeshResource {
    label: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    pub(crate) instance_data: Vec<PerInstanceRecord>,
    vertex_offset: u32,
    index_offset: u32,
    instance_offset: u32,
    instance_slots: Vec<u32>,
    draw_group: Option<DrawGroupId>,
}

impl MeshResource {
    fn new(mesh: Mesh, label: String) -> Self {
        Self {
            label,
            vertices: mesh.vertices,
            indices: mesh.indices,
            instance_data: Vec::new(),
            vertex_offset: 0,
            index_offset: 0,
            instance_offset: 0,
            instance_slots: Vec::new(),
            draw_group: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_data.len() as u32
    }

    pub fn instance_data(&self) -> &[PerInstanceRecord] {
        &self.instance_data
    }

    pub fn vertex_offset(&self) -> u32 {
        self.vertex_offset
    }

    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    pub fn instance_offset(&self) -> u32 {
        self.instance_offset
    }

    /// buildで割り当てられたグローバルなインスタンススロット
    pub fn instance_slots(&self) -> &[u32] {
        &self.instance_slots
    }

    pub fn draw_group(&self) -> Option<DrawGroupId> {
        self.draw_group
    }
}

/// グループ内の総数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Totals {
    vertices: u32,
    indices: u32,
    instances: u32,
}

/// (頂点数, インデックス数, インスタンス数)の合計を求め、表現範囲と容量を確認する
///
/// 頂点オフセットは間接描画コマンドで`i32`になるため、頂点総数は`i32::MAX`まで。
fn sum_counts(group: &str, counts: &[(u32, u32, u32)], max_instances: u32) -> Result<Totals, RenderError> {
    let (mut vertices, mut indices, mut instances) = (0u64, 0u64, 0u64);
    for &(v, i, n) in counts {
        vertices += u64::from(v);
        indices += u64::from(i);
        instances += u64::from(n);
    }

    let overflow = |kind: &'static str, requested: u64| RenderError::GeometryCapacityExceeded {
        group: group.to_string(),
        kind,
        requested,
    };
    let vertices = i32::try_from(vertices)
        .map(|v| v as u32)
        .map_err(|_| overflow("vertex", vertices))?;
    let indices = u32::try_from(indices).map_err(|_| overflow("index", indices))?;
    if instances > u64::from(max_instances) {
        return Err(RenderError::InstanceCapacityExceeded {
            group: group.to_string(),
            requested: u32::try_from(instances).unwrap_or(u32::MAX),
            capacity: max_instances,
        });
    }

    Ok(Totals {
        vertices,
        indices,
        instances: instances as u32,
    })
}

/// buildの計算結果（確定前）
struct MeshLayout {
    vertex_offset: u32,
    index_offset: u32,
    instance_offset: u32,
    instance_slots: Vec<u32>,
}

/// メッシュ集約器
#[derive(Debug, Default)]
pub struct MeshAggregator {
    config: AggregatorConfig,
    meshes: Vec<MeshResource>,
    groups: Vec<DrawGroup>,
}

impl MeshAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            meshes: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// 描画グループを作成
    pub fn create_draw_group(&mut self, name: impl Into<String>) -> DrawGroupId {
        let id = DrawGroupId(self.groups.len() as u32);
        let group = DrawGroup::new(id, name.into());
        tracing::debug!(group = %group.name(), "draw group created");
        self.groups.push(group);
        id
    }

    /// ジオメトリをアリーナに追加（まだどのグループにも属さない）
    pub fn add_mesh(&mut self, mesh: Mesh, label: impl Into<String>) -> MeshHandle {
        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(MeshResource::new(mesh, label.into()));
        handle
    }

    /// メッシュを描画グループに登録する（登録順がレイアウト順になる）
    pub fn register_mesh(&mut self, group: DrawGroupId, mesh: MeshHandle) -> Result<(), RenderError> {
        if group.0 as usize >= self.groups.len() {
            return Err(RenderError::UnknownDrawGroup(group));
        }
        let resource = self
            .meshes
            .get_mut(mesh.0 as usize)
            .ok_or(RenderError::UnknownMesh(mesh))?;
        if let Some(existing) = resource.draw_group {
            return Err(RenderError::MeshAlreadyGrouped { mesh, group: existing });
        }
        resource.draw_group = Some(group);

        let draw_group = &mut self.groups[group.0 as usize];
        draw_group.meshes.push(mesh);
        draw_group.mark_stale();
        Ok(())
    }

    /// インスタンスを追加してインスタンス番号を返す
    pub fn add_instance(&mut self, mesh: MeshHandle, record: PerInstanceRecord) -> Result<u32, RenderError> {
        let resource = self
            .meshes
            .get_mut(mesh.0 as usize)
            .ok_or(RenderError::UnknownMesh(mesh))?;
        let instance = resource.instance_data.len() as u32;
        resource.instance_data.push(record);

        if let Some(group) = resource.draw_group {
            self.groups[group.0 as usize].mark_stale();
        }
        Ok(instance)
    }

    /// オフセット・連結データ・間接描画コマンドを計算する
    ///
    /// 容量超過時は何も書き換えずにエラーを返す。
    pub fn build(&mut self, group: DrawGroupId) -> Result<(), RenderError> {
        let draw_group = self
            .groups
            .get(group.0 as usize)
            .ok_or(RenderError::UnknownDrawGroup(group))?;

        let mesh_count = draw_group.meshes.len() as u32;
        if mesh_count > self.config.max_meshes_per_group {
            return Err(RenderError::MeshCapacityExceeded {
                group: draw_group.name().to_string(),
                requested: mesh_count,
                capacity: self.config.max_meshes_per_group,
            });
        }

        let mut resources = Vec::with_capacity(draw_group.meshes.len());
        for &handle in &draw_group.meshes {
            let resource = self
                .meshes
                .get(handle.0 as usize)
                .ok_or(RenderError::UnknownMesh(handle))?;
            resources.push(resource);
        }

        // 1パス目: 合計
        let counts: Vec<(u32, u32, u32)> = resources
            .iter()
            .map(|r| (r.vertex_count(), r.index_count(), r.instance_count()))
            .collect();
        let totals = sum_counts(draw_group.name(), &counts, self.config.max_instances_per_group)?;
        let total_vertex_count = totals.vertices;
        let total_index_count = totals.indices;

        // 2パス目: 排他的プレフィックス和とインスタンススロット（合計が収まることは確認済み）
        let mut layouts = Vec::with_capacity(resources.len());
        let mut vertex_offset = 0u32;
        let mut index_offset = 0u32;
        let mut instance_offset = 0u32;
        for resource in &resources {
            let first_instance = instance_offset;
            let instance_slots: Vec<u32> = (0..resource.instance_count())
                .map(|i| first_instance + i)
                .collect();
            layouts.push(MeshLayout {
                vertex_offset,
                index_offset,
                instance_offset: first_instance,
                instance_slots,
            });

            vertex_offset += resource.vertex_count();
            index_offset += resource.index_count();
            instance_offset += resource.instance_count();
        }

        let mut staging = StagingData::default();
        let mut commands = Vec::with_capacity(resources.len());
        for (resource, layout) in resources.iter().zip(&layouts) {
            staging.vertices.extend_from_slice(&resource.vertices);
            staging.indices.extend_from_slice(&resource.indices);
            staging.instances.extend_from_slice(&resource.instance_data);
            commands.push(DrawCommand {
                index_count: resource.index_count(),
                instance_count: resource.instance_count(),
                first_index: layout.index_offset,
                // 頂点総数はi32::MAX以下
                vertex_offset: layout.vertex_offset as i32,
                first_instance: layout.instance_offset,
            });
        }

        // ここから確定
        let handles = draw_group.meshes.clone();
        for (handle, layout) in handles.into_iter().zip(layouts) {
            let resource = &mut self.meshes[handle.0 as usize];
            resource.vertex_offset = layout.vertex_offset;
            resource.index_offset = layout.index_offset;
            resource.instance_offset = layout.instance_offset;
            resource.instance_slots = layout.instance_slots;
        }

        let draw_group = &mut self.groups[group.0 as usize];
        draw_group.total_vertex_count = total_vertex_count;
        draw_group.total_index_count = total_index_count;
        draw_group.total_instance_count = totals.instances;
        draw_group.indirect_commands = commands;
        draw_group.staging = Some(staging);
        draw_group.state = LayoutState::Built;

        tracing::info!(
            group = %draw_group.name(),
            meshes = mesh_count,
            vertices = total_vertex_count,
            indices = total_index_count,
            instances = totals.instances,
            "draw group built"
        );
        Ok(())
    }

    /// GPUバッファを確保し、連結データの転送タスクを登録する
    ///
    /// 以前のバッファがあれば破棄して作り直す。
    pub fn upload(
        &mut self,
        group: DrawGroupId,
        backend: &mut dyn ResourceBackend,
        tasks: &mut FrameTasks,
    ) -> Result<(), RenderError> {
        let config = self.config;
        let draw_group = self
            .groups
            .get_mut(group.0 as usize)
            .ok_or(RenderError::UnknownDrawGroup(group))?;

        match draw_group.state {
            LayoutState::Built => {}
            LayoutState::Uploaded => {
                tracing::warn!(group = %draw_group.name(), "draw group already uploaded; ignoring");
                return Ok(());
            }
            LayoutState::Empty | LayoutState::Stale => {
                return Err(RenderError::NotBuilt(draw_group.name().to_string()));
            }
        }
        let Some(mut staging) = draw_group.staging.take() else {
            return Err(RenderError::NotBuilt(draw_group.name().to_string()));
        };

        // build後に同期キューが書き換えたインスタンスを反映する（個数はbuild時と同じ）
        staging.instances.clear();
        for handle in &draw_group.meshes {
            if let Some(resource) = self.meshes.get(handle.0 as usize) {
                staging.instances.extend_from_slice(&resource.instance_data);
            }
        }

        if let Some(old) = draw_group.buffers.take() {
            tracing::debug!(group = %draw_group.name(), "destroying previous draw group buffers");
            for buffer in old.all() {
                backend.destroy_buffer(buffer);
            }
        }

        let name = draw_group.name().to_string();
        let vertex_bytes: Vec<u8> = bytemuck::cast_slice(&staging.vertices).to_vec();
        let index_bytes: Vec<u8> = bytemuck::cast_slice(&staging.indices).to_vec();
        let instance_bytes: Vec<u8> = bytemuck::cast_slice(&staging.instances).to_vec();
        let command_bytes: Vec<u8> = bytemuck::cast_slice(&draw_group.indirect_commands).to_vec();

        let buffers = GroupBuffers {
            vertex: backend.create_buffer(&BufferDesc {
                label: &format!("{name} vertices"),
                size: vertex_bytes.len() as u64,
                kind: BufferKind::Vertex,
            }),
            index: backend.create_buffer(&BufferDesc {
                label: &format!("{name} indices"),
                size: index_bytes.len() as u64,
                kind: BufferKind::Index,
            }),
            instance: backend.create_buffer(&BufferDesc {
                label: &format!("{name} instances"),
                size: u64::from(config.max_instances_per_group) * PerInstanceRecord::SIZE,
                kind: BufferKind::Instance,
            }),
            commands: backend.create_buffer(&BufferDesc {
                label: &format!("{name} indirect commands"),
                size: u64::from(config.max_meshes_per_group) * DrawCommand::SIZE,
                kind: BufferKind::Indirect,
            }),
        };

        let transfers = [
            (buffers.vertex, vertex_bytes),
            (buffers.index, index_bytes),
            (buffers.instance, instance_bytes),
            (buffers.commands, command_bytes),
        ];
        let accesses = transfers
            .iter()
            .map(|(buffer, bytes)| BufferAccess::write(*buffer, 0, bytes.len() as u64))
            .collect();
        let label = name.clone();
        tasks.add_task(GpuTask::new(format!("upload {name}"), accesses, move |backend| {
            for (dst, bytes) in transfers {
                if bytes.is_empty() {
                    continue;
                }
                let size = bytes.len() as u64;
                let staging = backend.create_buffer(&BufferDesc {
                    label: &format!("{label} staging"),
                    size,
                    kind: BufferKind::Staging,
                });
                backend.write_buffer(staging, 0, &bytes);
                backend.copy_buffer_region(staging, dst, size);
                backend.destroy_buffer(staging);
            }
        }));

        draw_group.buffers = Some(buffers);
        draw_group.state = LayoutState::Uploaded;
        tracing::info!(group = %name, "draw group upload registered");
        Ok(())
    }

    /// 全描画グループのGPUバッファを破棄する
    ///
    /// 破棄したグループは再度build + uploadが必要になる。
    pub fn release(&mut self, backend: &mut dyn ResourceBackend) {
        for group in &mut self.groups {
            if let Some(buffers) = group.buffers.take() {
                for buffer in buffers.all() {
                    backend.destroy_buffer(buffer);
                }
                group.staging = None;
                group.state = LayoutState::Stale;
                tracing::debug!(group = %group.name(), "draw group buffers released");
            }
        }
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshResource> {
        self.meshes.get(handle.0 as usize)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn draw_group(&self, id: DrawGroupId) -> Option<&DrawGroup> {
        self.groups.get(id.0 as usize)
    }

    pub fn draw_groups(&self) -> impl Iterator<Item = &DrawGroup> {
        self.groups.iter()
    }

    /// メモリ上のインスタンスレコード（GPUへの反映は同期キューのflushで行う）
    pub fn instance_record_mut(&mut self, mesh: MeshHandle, instance: u32) -> Option<&mut PerInstanceRecord> {
        self.meshes
            .get_mut(mesh.0 as usize)?
            .instance_data
            .get_mut(instance as usize)
    }

    /// インスタンスバッファへの書き込み先（オフセット, バッファ）
    ///
    /// グループが未アップロードまたはレイアウトが古い場合はNone。
    pub(crate) fn instance_target(&self, mesh: MeshHandle) -> Option<(BufferHandle, u64)> {
        let resource = self.mesh(mesh)?;
        let group = self.draw_group(resource.draw_group?)?;
        if !group.is_uploaded() {
            return None;
        }
        let buffers = group.buffers()?;
        Some((
            buffers.instance,
            u64::from(resource.instance_offset) * PerInstanceRecord::SIZE,
        ))
    }
}
