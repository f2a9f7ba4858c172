// ============================================================================
// src/group/types.rs - グループ関連の基本型
// ============================================================================
use alloc::string::String;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;
use uuid::Uuid;

use crate::error::NameError;

// ============================================================================
// 定数（ワイヤ契約の一部）
// ============================================================================

/// 1グループあたりの最大メンバー数
pub const MAX_GROUP_SIZE: usize = 24;

/// 「グループなし」を表す予約値
pub const NULL_GROUP_ID: GroupId = GroupId(0x7FFF);

/// 「無効/未発見」を表す予約値
pub const INVAL_GROUP_ID: GroupId = GroupId(0xFFFF);

/// ハンドルのバイト長
pub const GROUP_HANDLE_LEN: usize = 16;

// ============================================================================
// グループID
// ============================================================================

/// グループを識別する16ビットID
///
/// `0..=0x7FFE` が割り当て可能。`0x7FFF` と `0xFFFF` は番兵。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(u16);

impl GroupId {
    /// 割り当て可能な最大ID
    pub const MAX_ASSIGNABLE: GroupId = GroupId(NULL_GROUP_ID.0 - 1);

    /// 割り当て可能なIDの総数
    pub const ASSIGNABLE_COUNT: usize = NULL_GROUP_ID.0 as usize;

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// 番兵ではない、割り当て可能なIDかどうか
    pub const fn is_assignable(&self) -> bool {
        self.0 < NULL_GROUP_ID.0
    }

    /// 次の候補ID（予約領域に達したら0へ折り返す）
    pub(crate) const fn next_wrapping(&self) -> Self {
        if self.0 >= Self::MAX_ASSIGNABLE.0 {
            GroupId(0)
        } else {
            GroupId(self.0 + 1)
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NULL_GROUP_ID => write!(f, "Group(null)"),
            INVAL_GROUP_ID => write!(f, "Group(invalid)"),
            GroupId(id) => write!(f, "Group({})", id),
        }
    }
}

impl From<u16> for GroupId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

// ============================================================================
// ドメインID
// ============================================================================

/// 実行ドメインの識別子
///
/// 外部のドメインライフサイクル側が所有・検証する。本クレートでは
/// 比較可能なトークンとしてのみ扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(u16);

impl DomainId {
    /// 予約領域の先頭（これ以上のIDは実ドメインを指さない）
    pub const FIRST_RESERVED: DomainId = DomainId(0x7FF0);

    /// `member_list` の空きスロットを埋める値
    pub const INVALID: DomainId = DomainId(0x7FF4);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    pub const fn is_reserved(&self) -> bool {
        self.0 >= Self::FIRST_RESERVED.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Domain({})", self.0)
    }
}

impl From<u16> for DomainId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

// ============================================================================
// グループハンドル
// ============================================================================

/// ツール側の相関タグ（16バイト）
///
/// レジストリは中身を解釈せず、作成時と照会時にそのままコピーする。
/// ツール側はこれをグループのUUIDとして扱うため、UUID表記との
/// 相互変換を提供する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GroupHandle([u8; GROUP_HANDLE_LEN]);

impl GroupHandle {
    pub const fn new(bytes: [u8; GROUP_HANDLE_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; GROUP_HANDLE_LEN] {
        &self.0
    }

    pub const fn as_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }

    /// UUID表記（ハイフン付き/なし）からハンドルを作成
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self::from)
    }

    pub fn is_nil(&self) -> bool {
        self.as_uuid().is_nil()
    }
}

impl From<Uuid> for GroupHandle {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.into_bytes())
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_uuid().hyphenated())
    }
}

impl From<[u8; GROUP_HANDLE_LEN]> for GroupHandle {
    fn from(bytes: [u8; GROUP_HANDLE_LEN]) -> Self {
        Self(bytes)
    }
}

// ============================================================================
// グループ名
// ============================================================================

/// 名前に使える記号
const NAME_SYMBOLS: &str = "_-.:/+";

/// 検証済みのグループ名
///
/// 空でなく、ASCII英数字と `_-.:/+` のみからなる。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(c) = name
            .chars()
            .find(|&c| !c.is_ascii_alphanumeric() && !NAME_SYMBOLS.contains(c))
        {
            return Err(NameError::InvalidChar(c));
        }
        Ok(Self(String::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GroupName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for GroupName {
    type Error = NameError;

    fn try_from(name: &str) -> Result<Self, NameError> {
        Self::new(name)
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ドメイングループ
// ============================================================================

/// ドメイングループ本体
///
/// `members` は参加順を保持する。サイズは常に `MAX_GROUP_SIZE` 以下。
#[derive(Debug, Clone)]
pub struct DomainGroup {
    id: GroupId,
    members: Vec<DomainId>,
    handle: GroupHandle,
    name: Option<GroupName>,
}

impl DomainGroup {
    /// 空のグループを作成
    pub fn new(id: GroupId, handle: GroupHandle) -> Self {
        Self {
            id,
            members: Vec::with_capacity(MAX_GROUP_SIZE),
            handle,
            name: None,
        }
    }

    pub fn with_name(mut self, name: GroupName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn handle(&self) -> GroupHandle {
        self.handle
    }

    pub fn name(&self) -> Option<&GroupName> {
        self.name.as_ref()
    }

    /// 参加順のメンバー一覧
    pub fn members(&self) -> &[DomainId] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_GROUP_SIZE
    }

    pub fn contains(&self, domid: DomainId) -> bool {
        self.members.contains(&domid)
    }

    /// メンバーを追加（満杯または重複なら false）
    pub(crate) fn add_member(&mut self, domid: DomainId) -> bool {
        if self.is_full() || self.contains(domid) {
            return false;
        }
        self.members.push(domid);
        true
    }

    /// メンバーを削除（存在しなければ false）
    pub(crate) fn remove_member(&mut self, domid: DomainId) -> bool {
        let before = self.members.len();
        self.members.retain(|&id| id != domid);
        self.members.len() != before
    }

    /// 照会用のスナップショットを作成
    pub fn info(&self) -> GroupInfo {
        let mut member_list = [DomainId::INVALID; MAX_GROUP_SIZE];
        for (slot, &domid) in member_list.iter_mut().zip(self.members.iter()) {
            *slot = domid;
        }
        GroupInfo {
            dgid: self.id,
            size: self.members.len(),
            member_list,
            handle: self.handle,
            name: self.name.clone(),
        }
    }
}

/// グループ照会結果（ある瞬間のスナップショット）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub dgid: GroupId,
    pub size: usize,
    /// 先頭 `size` 個が有効、残りは `DomainId::INVALID`
    pub member_list: [DomainId; MAX_GROUP_SIZE],
    pub handle: GroupHandle,
    pub name: Option<GroupName>,
}

impl GroupInfo {
    /// 有効なメンバーのみ
    pub fn members(&self) -> &[DomainId] {
        &self.member_list[..self.size]
    }
}
