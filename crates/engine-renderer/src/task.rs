//! 転送タスク
//!
//! 集約器と同期キューは書き込みを直接行わず、アクセス宣言とコールバックの組を
//! `FrameTasks`に登録するだけ。実行の順序付け・同期はタスクを実行する側の責務。

use crate::backend::{BufferHandle, ResourceBackend};

/// バッファへのアクセス種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// タスクが触れるバッファ領域の宣言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferAccess {
    pub buffer: BufferHandle,
    pub offset: u64,
    pub size: u64,
    pub access: Access,
}

impl BufferAccess {
    pub fn write(buffer: BufferHandle, offset: u64, size: u64) -> Self {
        Self {
            buffer,
            offset,
            size,
            access: Access::Write,
        }
    }

    pub fn read(buffer: BufferHandle, offset: u64, size: u64) -> Self {
        Self {
            buffer,
            offset,
            size,
            access: Access::Read,
        }
    }
}

type TaskFn = Box<dyn FnOnce(&mut dyn ResourceBackend)>;

/// 1回だけ実行される転送タスク
pub struct GpuTask {
    name: String,
    accesses: Vec<BufferAccess>,
    run: TaskFn,
}

impl GpuTask {
    pub fn new(
        name: impl Into<String>,
        accesses: Vec<BufferAccess>,
        run: impl FnOnce(&mut dyn ResourceBackend) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            accesses,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accesses(&self) -> &[BufferAccess] {
        &self.accesses
    }
}

impl std::fmt::Debug for GpuTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTask")
            .field("name", &self.name)
            .field("accesses", &self.accesses)
            .finish_non_exhaustive()
    }
}

/// 1フレーム分の転送タスク列（Worldのリソースとして置く）
#[derive(Debug, Default)]
pub struct FrameTasks {
    tasks: Vec<GpuTask>,
}

impl FrameTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// タスクを登録
    pub fn add_task(&mut self, task: GpuTask) {
        tracing::debug!(task = %task.name, accesses = task.accesses.len(), "task registered");
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 登録順のタスク名
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn tasks(&self) -> &[GpuTask] {
        &self.tasks
    }

    /// 登録順にすべて実行して空にする。実行したタスク数を返す
    pub fn execute(&mut self, backend: &mut dyn ResourceBackend) -> usize {
        let count = self.tasks.len();
        for task in self.tasks.drain(..) {
            (task.run)(&mut *backend);
        }
        count
    }
}
