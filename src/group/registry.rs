// ============================================================================
// src/group/registry.rs - Group Registry
// グループIDの割り当てと、生存中の全グループの管理
// ============================================================================

use alloc::collections::BTreeMap;
use hashbrown::HashMap;
use spin::{Mutex, MutexGuard};

use super::types::{DomainGroup, DomainId, GroupHandle, GroupId, GroupName};
use crate::error::{GroupError, GroupResult};

/// グループレジストリ
///
/// ID→グループの対応表、ID割り当てカーソル、ドメイン→グループの
/// 逆引き表、名前の索引を1つのロックで保護する。読み取り後に書き込む操作は
/// すべてこのロックを保持したまま実行される。
pub struct GroupRegistry {
    inner: Mutex<RegistryInner>,
}

impl GroupRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::new()),
        }
    }

    /// レジストリ全体のロックを取得
    pub(crate) fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock()
    }

    /// グループのスナップショットを取得
    pub fn find(&self, dgid: GroupId) -> GroupResult<DomainGroup> {
        self.lock().find(dgid).cloned()
    }

    pub fn contains(&self, dgid: GroupId) -> bool {
        self.lock().groups.contains_key(&dgid)
    }

    /// ドメインが所属しているグループ
    pub fn group_of(&self, domid: DomainId) -> Option<GroupId> {
        self.lock().group_of(domid)
    }

    /// 生存中のグループ数
    pub fn len(&self) -> usize {
        self.lock().groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// レジストリ統計を取得
    pub fn stats(&self) -> GroupStats {
        let inner = self.lock();
        GroupStats {
            groups: inner.groups.len(),
            members: inner.groups.values().map(DomainGroup::size).sum(),
            free_ids: inner.free,
        }
    }

    /// 操作カウンタを取得
    #[cfg(feature = "stats")]
    pub fn op_counters(&self) -> OpCounters {
        self.lock().counters
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// ロック内で保護される状態
pub(crate) struct RegistryInner {
    /// グループID -> グループ
    groups: BTreeMap<GroupId, DomainGroup>,
    /// ドメインID -> 所属グループID（弱い関係、所有はしない）
    backrefs: HashMap<DomainId, GroupId>,
    /// グループ名 -> グループID（名前付きグループのみ）
    names: HashMap<GroupName, GroupId>,
    /// 次の割り当て候補
    cursor: GroupId,
    /// 未使用IDの数
    free: usize,
    #[cfg(feature = "stats")]
    counters: OpCounters,
}

impl RegistryInner {
    fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            backrefs: HashMap::new(),
            names: HashMap::new(),
            cursor: GroupId::new(0),
            free: GroupId::ASSIGNABLE_COUNT,
            #[cfg(feature = "stats")]
            counters: OpCounters::default(),
        }
    }

    /// 未使用のグループIDを割り当てる
    ///
    /// カーソルから前方に走査し、最初の空きIDを返す。カーソルは
    /// 返したIDの次へ進むため、直前に解放されたIDはすぐには再利用されない。
    pub(crate) fn allocate_id(&mut self) -> GroupResult<GroupId> {
        if self.free == 0 {
            return Err(GroupError::ResourceExhausted);
        }

        let mut candidate = self.cursor;
        for _ in 0..GroupId::ASSIGNABLE_COUNT {
            if !self.groups.contains_key(&candidate) {
                self.cursor = candidate.next_wrapping();
                return Ok(candidate);
            }
            candidate = candidate.next_wrapping();
        }

        Err(GroupError::ResourceExhausted)
    }

    pub(crate) fn find(&self, dgid: GroupId) -> GroupResult<&DomainGroup> {
        self.groups.get(&dgid).ok_or(GroupError::GroupNotFound(dgid))
    }

    pub(crate) fn find_mut(&mut self, dgid: GroupId) -> GroupResult<&mut DomainGroup> {
        self.groups
            .get_mut(&dgid)
            .ok_or(GroupError::GroupNotFound(dgid))
    }

    /// グループを登録（IDは `allocate_id` で得たもの、名前は未使用のもの）
    pub(crate) fn insert(&mut self, group: DomainGroup) {
        debug_assert!(group.id().is_assignable());
        if let Some(name) = group.name() {
            debug_assert!(!self.names.contains_key(name.as_str()));
            self.names.insert(name.clone(), group.id());
        }
        if self.groups.insert(group.id(), group).is_none() {
            self.free -= 1;
        }
    }

    /// グループを削除
    pub(crate) fn remove(&mut self, dgid: GroupId) -> Option<DomainGroup> {
        let group = self.groups.remove(&dgid)?;
        if let Some(name) = group.name() {
            self.names.remove(name.as_str());
        }
        self.free += 1;
        Some(group)
    }

    /// 名前でグループを検索
    pub(crate) fn find_by_name(&self, name: &str) -> Option<&DomainGroup> {
        let dgid = self.names.get(name)?;
        self.groups.get(dgid)
    }

    /// ハンドルでグループを検索（最小IDのもの）
    pub(crate) fn find_by_handle(&self, handle: GroupHandle) -> Option<&DomainGroup> {
        self.groups.values().find(|group| group.handle() == handle)
    }

    /// `cursor` 以上で最小のIDを持つグループ
    pub(crate) fn next_from(&self, cursor: GroupId) -> Option<&DomainGroup> {
        self.groups.range(cursor..).next().map(|(_, group)| group)
    }

    pub(crate) fn group_of(&self, domid: DomainId) -> Option<GroupId> {
        self.backrefs.get(&domid).copied()
    }

    pub(crate) fn link(&mut self, domid: DomainId, dgid: GroupId) {
        self.backrefs.insert(domid, dgid);
    }

    pub(crate) fn unlink(&mut self, domid: DomainId) -> Option<GroupId> {
        self.backrefs.remove(&domid)
    }

    /// 操作カウンタを進める（`stats` 無効時は何もしない）
    #[inline]
    pub(crate) fn count(&mut self, op: CountedOp) {
        #[cfg(feature = "stats")]
        self.counters.bump(op);
        #[cfg(not(feature = "stats"))]
        let _ = op;
    }
}

/// レジストリ統計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStats {
    /// 生存中のグループ数
    pub groups: usize,
    /// 全グループのメンバー総数
    pub members: usize,
    /// 未使用のグループID数
    pub free_ids: usize,
}

/// カウント対象の操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountedOp {
    Create,
    Destroy,
    Join,
    Leave,
    PartialFailure,
}

/// 操作カウンタ
#[cfg(feature = "stats")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounters {
    pub created: u64,
    pub destroyed: u64,
    pub joined: u64,
    pub left: u64,
    pub partial_failures: u64,
}

#[cfg(feature = "stats")]
impl OpCounters {
    fn bump(&mut self, op: CountedOp) {
        let slot = match op {
            CountedOp::Create => &mut self.created,
            CountedOp::Destroy => &mut self.destroyed,
            CountedOp::Join => &mut self.joined,
            CountedOp::Leave => &mut self.left,
            CountedOp::PartialFailure => &mut self.partial_failures,
        };
        *slot += 1;
    }
}
