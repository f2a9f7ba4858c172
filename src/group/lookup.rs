// ============================================================================
// src/group/lookup.rs - Group Lookup
// 名前・ID・ハンドルによるグループの検索
// ============================================================================

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use super::registry::{GroupRegistry, RegistryInner};
use super::types::{DomainGroup, DomainId, GroupHandle, GroupId, GroupInfo, GroupName};
use crate::error::{GroupError, GroupResult};

/// 検索キー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    Name(GroupName),
    Id(GroupId),
    /// ハンドル（ツール側のUUID）
    Handle(GroupHandle),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Name(name) => write!(f, "name {}", name),
            GroupKey::Id(dgid) => write!(f, "{}", dgid),
            GroupKey::Handle(handle) => write!(f, "handle {}", handle),
        }
    }
}

impl From<GroupId> for GroupKey {
    fn from(dgid: GroupId) -> Self {
        GroupKey::Id(dgid)
    }
}

impl From<GroupName> for GroupKey {
    fn from(name: GroupName) -> Self {
        GroupKey::Name(name)
    }
}

impl From<GroupHandle> for GroupKey {
    fn from(handle: GroupHandle) -> Self {
        GroupKey::Handle(handle)
    }
}

/// キーに一致するグループのスナップショットを取得
///
/// IDで見つからなければ `GroupNotFound`、名前/ハンドルなら `NoMatch`。
pub fn lookup_group(registry: &GroupRegistry, key: &GroupKey) -> GroupResult<GroupInfo> {
    let inner = registry.lock();
    let found = match key {
        GroupKey::Name(name) => inner.find_by_name(name.as_str()),
        GroupKey::Id(dgid) => return inner.find(*dgid).map(DomainGroup::info),
        GroupKey::Handle(handle) => inner.find_by_handle(*handle),
    };
    found
        .map(DomainGroup::info)
        .ok_or_else(|| GroupError::NoMatch(key.to_string()))
}

/// 利用者が入力したテキストでグループを検索
///
/// 名前 → 10進のID → UUID表記のハンドル の順に試し、最初に一致した
/// ものを返す。数字だけの名前を持つグループは同じ値のIDより優先される。
pub fn resolve_group(registry: &GroupRegistry, text: &str) -> GroupResult<GroupInfo> {
    let inner = registry.lock();
    resolve_in(&inner, text)
        .map(DomainGroup::info)
        .ok_or_else(|| GroupError::NoMatch(String::from(text)))
}

fn resolve_in<'a>(inner: &'a RegistryInner, text: &str) -> Option<&'a DomainGroup> {
    if let Some(group) = inner.find_by_name(text) {
        return Some(group);
    }
    if let Some(group) = text
        .parse::<u16>()
        .ok()
        .and_then(|raw| inner.find(GroupId::new(raw)).ok())
    {
        return Some(group);
    }
    GroupHandle::parse(text).and_then(|handle| inner.find_by_handle(handle))
}

/// グループのメンバー一覧（参加順）
pub fn group_members(registry: &GroupRegistry, dgid: GroupId) -> GroupResult<Vec<DomainId>> {
    Ok(registry.lock().find(dgid)?.members().to_vec())
}
