//! 統一エラーハンドリングモジュール
//!
//! グループ操作で使用されるエラー型と、外部ドメインライフサイクルが
//! 返すエラー型を定義します。すべての失敗は値として呼び出し側に返され、
//! 握りつぶされることはありません。

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::group::lifecycle::{GroupOp, GroupOpReport};
use crate::group::types::{DomainId, GroupId, GroupName};

/// グループ操作の統一エラー型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// グループが存在しない
    GroupNotFound(GroupId),
    /// ドメインが存在しない
    DomainNotFound(DomainId),
    /// ドメインは既にいずれかのグループに所属している
    AlreadyMember { domid: DomainId, dgid: GroupId },
    /// ドメインはどのグループにも所属していない
    NotMember(DomainId),
    /// グループが満杯
    CapacityExceeded(GroupId),
    /// 割り当て可能なグループIDが枯渇
    ResourceExhausted,
    /// 破棄中のメンバー切り離しに失敗（グループは変更されない）
    DetachFailed {
        dgid: GroupId,
        domid: DomainId,
        reason: LifecycleError,
    },
    /// 一時停止/再開が途中で停止した（混在状態）
    PartialFailure(PartialFailure),
    /// 単一ドメインへの操作が失敗
    Lifecycle {
        domid: DomainId,
        reason: LifecycleError,
    },
    /// グループ名が不正
    InvalidName(NameError),
    /// 同名のグループが既に存在する
    NameInUse { name: GroupName, dgid: GroupId },
    /// 名前/ハンドル/テキストに一致するグループがない
    NoMatch(String),
    /// 未知のインターフェースバージョン
    VersionMismatch { expected: u32, found: u32 },
}

impl GroupError {
    /// ドメイン操作の失敗をグループエラーに変換
    pub fn from_lifecycle(domid: DomainId, reason: LifecycleError) -> Self {
        match reason {
            LifecycleError::NoSuchDomain => GroupError::DomainNotFound(domid),
            reason => GroupError::Lifecycle { domid, reason },
        }
    }
}

/// 外部ドメインライフサイクルが返すエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// ドメインが存在しない
    NoSuchDomain,
    /// ドメインが一時的に操作できない
    Busy,
    /// ドメインが操作を拒否した
    Refused,
    /// その他の失敗（下位のエラーコード）
    Failed(i32),
}

/// グループ名の検証エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// 空の名前
    Empty,
    /// 使用できない文字
    InvalidChar(char),
}

/// 一時停止/再開/シャットダウンの部分失敗
///
/// `report` には全メンバーの結果が入る。`index` より前のメンバーには
/// 操作が適用済みで、ロールバックはされない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    pub dgid: GroupId,
    pub op: GroupOp,
    /// 最初に失敗したメンバーの位置（参加順）
    pub index: usize,
    pub domid: DomainId,
    pub reason: LifecycleError,
    pub report: GroupOpReport,
}

impl PartialFailure {
    /// 操作が適用済みのメンバー
    pub fn completed(&self) -> Vec<DomainId> {
        self.report.completed()
    }
}

// ===== Display implementations =====

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupError::GroupNotFound(dgid) => write!(f, "{} not found", dgid),
            GroupError::DomainNotFound(domid) => write!(f, "{} not found", domid),
            GroupError::AlreadyMember { domid, dgid } => {
                write!(f, "{} is already a member of {}", domid, dgid)
            }
            GroupError::NotMember(domid) => write!(f, "{} is not a member of any group", domid),
            GroupError::CapacityExceeded(dgid) => write!(f, "{} is full", dgid),
            GroupError::ResourceExhausted => write!(f, "group id space exhausted"),
            GroupError::DetachFailed { dgid, domid, reason } => {
                write!(f, "destroy of {} aborted: detach {} failed: {}", dgid, domid, reason)
            }
            GroupError::PartialFailure(pf) => write!(f, "{}", pf),
            GroupError::Lifecycle { domid, reason } => write!(f, "{}: {}", domid, reason),
            GroupError::InvalidName(err) => write!(f, "{}", err),
            GroupError::NameInUse { name, dgid } => {
                write!(f, "group name {} already used by {}", name, dgid)
            }
            GroupError::NoMatch(key) => write!(f, "no group matches {}", key),
            GroupError::VersionMismatch { expected, found } => write!(
                f,
                "interface version mismatch: expected {:#010x}, found {:#010x}",
                expected, found
            ),
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::NoSuchDomain => write!(f, "no such domain"),
            LifecycleError::Busy => write!(f, "domain busy"),
            LifecycleError::Refused => write!(f, "operation refused"),
            LifecycleError::Failed(code) => write!(f, "failed with code {}", code),
        }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "missing group name"),
            NameError::InvalidChar(c) => write!(f, "invalid character {:?} in group name", c),
        }
    }
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} stopped at member #{} ({}): {}; {} member(s) already applied",
            self.op,
            self.dgid,
            self.index,
            self.domid,
            self.reason,
            self.completed().len()
        )
    }
}

// ===== From implementations =====

impl From<PartialFailure> for GroupError {
    fn from(pf: PartialFailure) -> Self {
        GroupError::PartialFailure(pf)
    }
}

impl From<NameError> for GroupError {
    fn from(err: NameError) -> Self {
        GroupError::InvalidName(err)
    }
}

// ===== Result type alias =====

/// グループ操作の結果型エイリアス
pub type GroupResult<T> = Result<T, GroupError>;

// ===== Error extension trait =====

/// エラーに追加情報を付加するためのトレイト
pub trait ErrorContext<T> {
    /// エラーにコンテキスト情報を追加
    fn context(self, ctx: &'static str) -> Result<T, ContextualError>;
}

/// コンテキスト付きエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualError {
    pub error: GroupError,
    pub context: &'static str,
}

impl<T, E: Into<GroupError>> ErrorContext<T> for Result<T, E> {
    fn context(self, ctx: &'static str) -> Result<T, ContextualError> {
        self.map_err(|e| ContextualError {
            error: e.into(),
            context: ctx,
        })
    }
}

impl fmt::Display for ContextualError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}
