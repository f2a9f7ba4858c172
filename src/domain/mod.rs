// ============================================================================
// src/domain/mod.rs - 外部ドメインライフサイクルとの境界
// ============================================================================
//!
//! ドメイン（仮想マシン）の生成・スケジューリングは外部サブシステムが担う。
//! グループ管理はこのトレイト越しに、単一ドメインの検索・一時停止・再開・
//! グループへの紐付け/切り離しだけを要求する。
//!
//! 各呼び出しは同期的で有限時間内に完了するものとして扱う。
//! 失敗時の再試行は行わない（再試行方針は呼び出し側の責務）。

pub mod sim;

pub use sim::{DomainState, SimDomains, SimOp};

use core::fmt;

use crate::error::LifecycleError;
use crate::group::types::{DomainId, GroupId};

/// シャットダウン要求の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShutdownReason {
    Poweroff,
    Reboot,
    Suspend,
    Crash,
    Halt,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownReason::Poweroff => "poweroff",
            ShutdownReason::Reboot => "reboot",
            ShutdownReason::Suspend => "suspend",
            ShutdownReason::Crash => "crash",
            ShutdownReason::Halt => "halt",
        };
        f.write_str(name)
    }
}

/// 単一ドメインに対するライフサイクル操作
pub trait DomainLifecycle {
    /// ドメインが存在するか確認
    fn locate(&self, domid: DomainId) -> Result<(), LifecycleError>;

    /// ドメインが現在所属しているグループ（なければ `NULL_GROUP_ID`）
    ///
    /// 所属判定の正はドメイン側が持つこの値。
    fn current_group(&self, domid: DomainId) -> Result<GroupId, LifecycleError>;

    /// ドメインにグループへの逆参照を記録
    fn attach(&self, domid: DomainId, dgid: GroupId) -> Result<(), LifecycleError>;

    /// ドメインからグループへの逆参照を消去
    fn detach(&self, domid: DomainId, dgid: GroupId) -> Result<(), LifecycleError>;

    /// ドメインを一時停止
    fn pause(&self, domid: DomainId) -> Result<(), LifecycleError>;

    /// ドメインを再開
    fn unpause(&self, domid: DomainId) -> Result<(), LifecycleError>;

    /// ドメインにシャットダウンを要求
    ///
    /// 要求を受け付けた時点で成功を返す。停止の完了は待たない。
    fn shutdown(&self, domid: DomainId, reason: ShutdownReason) -> Result<(), LifecycleError>;
}

impl<T: DomainLifecycle + ?Sized> DomainLifecycle for alloc::sync::Arc<T> {
    fn locate(&self, domid: DomainId) -> Result<(), LifecycleError> {
        (**self).locate(domid)
    }

    fn current_group(&self, domid: DomainId) -> Result<GroupId, LifecycleError> {
        (**self).current_group(domid)
    }

    fn attach(&self, domid: DomainId, dgid: GroupId) -> Result<(), LifecycleError> {
        (**self).attach(domid, dgid)
    }

    fn detach(&self, domid: DomainId, dgid: GroupId) -> Result<(), LifecycleError> {
        (**self).detach(domid, dgid)
    }

    fn pause(&self, domid: DomainId) -> Result<(), LifecycleError> {
        (**self).pause(domid)
    }

    fn unpause(&self, domid: DomainId) -> Result<(), LifecycleError> {
        (**self).unpause(domid)
    }

    fn shutdown(&self, domid: DomainId, reason: ShutdownReason) -> Result<(), LifecycleError> {
        (**self).shutdown(domid, reason)
    }
}
