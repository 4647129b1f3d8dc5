use std::fmt;
use std::num::NonZeroU32;

/// Entity識別子
/// - 単調増加で発行され、参照中に再利用されることはない
/// - 0は無効値として予約（NonZeroU32なので表現不可能）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    /// 無効値（0）を表す生の値
    pub const INVALID_RAW: u32 = 0;

    /// 生の値からEntityIdを作成
    /// 0の場合はNoneを返す
    #[inline]
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// 生の値を取得
    #[inline]
    pub fn to_u32(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// EntityIdの発行器
/// 1から始まる単調増加カウンタ
#[derive(Debug)]
pub struct EntityAllocator {
    next: u32,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// 次のEntityIdを発行
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next).expect("entity counter starts at 1");
        self.next = self
            .next
            .checked_add(1)
            .expect("entity id space exhausted");
        id
    }

    /// これまでに発行したEntity数
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
