// ============================================================================
// src/group/lifecycle.rs - Group Lifecycle Management
// グループの作成・破棄と、全メンバーへの一時停止/再開/シャットダウン
// ============================================================================

use alloc::vec::Vec;
use core::fmt;
use log::{error, info, warn};

use super::membership::release;
use super::registry::{CountedOp, GroupRegistry};
use super::types::{DomainGroup, DomainId, GroupHandle, GroupId, GroupName};
use crate::domain::{DomainLifecycle, ShutdownReason};
use crate::error::{GroupError, GroupResult, LifecycleError, PartialFailure};

/// グループ全体に適用する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    Pause,
    Unpause,
    Shutdown(ShutdownReason),
}

impl fmt::Display for GroupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOp::Pause => write!(f, "pause"),
            GroupOp::Unpause => write!(f, "unpause"),
            GroupOp::Shutdown(reason) => write!(f, "shutdown({})", reason),
        }
    }
}

/// メンバー1つ分の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    /// 適用済み
    Done,
    /// 失敗
    Failed(LifecycleError),
    /// 先行メンバーの失敗により未実行
    NotAttempted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberOutcome {
    pub domid: DomainId,
    pub status: MemberStatus,
}

/// 一時停止/再開/シャットダウンの結果（参加順）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOpReport {
    pub dgid: GroupId,
    pub op: GroupOp,
    outcomes: Vec<MemberOutcome>,
}

impl GroupOpReport {
    fn new(dgid: GroupId, op: GroupOp) -> Self {
        Self {
            dgid,
            op,
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, domid: DomainId, status: MemberStatus) {
        self.outcomes.push(MemberOutcome { domid, status });
    }

    pub fn outcomes(&self) -> &[MemberOutcome] {
        &self.outcomes
    }

    /// 操作が適用済みのメンバー
    pub fn completed(&self) -> Vec<DomainId> {
        self.outcomes
            .iter()
            .filter(|o| o.status == MemberStatus::Done)
            .map(|o| o.domid)
            .collect()
    }

    /// 全メンバーに適用できたか
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == MemberStatus::Done)
    }
}

/// 新しいグループを作成
pub fn create_group(registry: &GroupRegistry, handle: GroupHandle) -> GroupResult<GroupId> {
    let mut inner = registry.lock();
    let dgid = inner.allocate_id()?;
    inner.insert(DomainGroup::new(dgid, handle));
    inner.count(CountedOp::Create);

    info!(target: "dgroup", "Created {} (handle {})", dgid, handle);
    Ok(dgid)
}

/// 名前付きのグループを作成
///
/// 名前はレジストリ内で一意。既に使われていれば `NameInUse`。
pub fn create_named_group(
    registry: &GroupRegistry,
    handle: GroupHandle,
    name: GroupName,
) -> GroupResult<GroupId> {
    let mut inner = registry.lock();
    if let Some(owner) = inner.find_by_name(name.as_str()) {
        return Err(GroupError::NameInUse {
            dgid: owner.id(),
            name,
        });
    }

    let dgid = inner.allocate_id()?;
    info!(target: "dgroup", "Created {} \"{}\" (handle {})", dgid, name, handle);
    inner.insert(DomainGroup::new(dgid, handle).with_name(name));
    inner.count(CountedOp::Create);
    Ok(dgid)
}

/// グループを破棄
///
/// 全メンバーを切り離してからレジストリから削除する。途中で切り離しに
/// 失敗した場合は、今回切り離したメンバーを再び紐付けてグループを
/// 変更前の状態のまま残す。ドメイン側で既に外れているメンバーは
/// 切り離し済みとして扱う。
pub fn destroy_group<L>(registry: &GroupRegistry, domains: &L, dgid: GroupId) -> GroupResult<()>
where
    L: DomainLifecycle + ?Sized,
{
    let mut inner = registry.lock();
    let members = inner.find(dgid)?.members().to_vec();

    let mut detached = Vec::with_capacity(members.len());
    for &domid in &members {
        match release(domains, domid, dgid) {
            Ok(true) => detached.push(domid),
            Ok(false) => {
                #[cfg(feature = "verbose_logging")]
                log::trace!(target: "dgroup", "{}: {} already detached", dgid, domid);
            }
            Err(reason) => {
                warn!(
                    target: "dgroup",
                    "Destroy of {} aborted: detach {} failed: {}", dgid, domid, reason
                );
                reattach(domains, dgid, &detached);
                return Err(GroupError::DetachFailed { dgid, domid, reason });
            }
        }
    }

    for &domid in &members {
        inner.unlink(domid);
    }
    inner.remove(dgid);
    inner.count(CountedOp::Destroy);

    info!(target: "dgroup", "Destroyed {} ({} members detached)", dgid, members.len());
    Ok(())
}

/// 破棄中断時に切り離し済みメンバーを戻す
fn reattach<L>(domains: &L, dgid: GroupId, detached: &[DomainId])
where
    L: DomainLifecycle + ?Sized,
{
    for &domid in detached.iter().rev() {
        if let Err(err) = domains.attach(domid, dgid) {
            error!(
                target: "dgroup",
                "Failed to restore {} into {} after aborted destroy: {}", domid, dgid, err
            );
        }
    }
}

/// グループの全メンバーを一時停止
///
/// 参加順に1つずつ停止する。途中で失敗した場合それ以降は実行せず、
/// 停止済みのメンバーも元に戻さない（混在状態になる）。
/// その場合は `GroupError::PartialFailure` に全メンバーの結果が入る。
pub fn pause_group<L>(
    registry: &GroupRegistry,
    domains: &L,
    dgid: GroupId,
) -> GroupResult<GroupOpReport>
where
    L: DomainLifecycle + ?Sized,
{
    apply_to_members(registry, domains, dgid, GroupOp::Pause)
}

/// グループの全メンバーを再開
///
/// 失敗時の扱いは [`pause_group`] と同じ。再開済みのメンバーへの
/// 再開は冪等なので、混在状態は再実行で解消できる。
pub fn unpause_group<L>(
    registry: &GroupRegistry,
    domains: &L,
    dgid: GroupId,
) -> GroupResult<GroupOpReport>
where
    L: DomainLifecycle + ?Sized,
{
    apply_to_members(registry, domains, dgid, GroupOp::Unpause)
}

/// グループの全メンバーにシャットダウンを要求
///
/// 失敗時の扱いは [`pause_group`] と同じ。メンバーの離脱は行わない
/// （消滅したドメインは [`forget_domain`](super::membership::forget_domain) で外す）。
pub fn shutdown_group<L>(
    registry: &GroupRegistry,
    domains: &L,
    dgid: GroupId,
    reason: ShutdownReason,
) -> GroupResult<GroupOpReport>
where
    L: DomainLifecycle + ?Sized,
{
    apply_to_members(registry, domains, dgid, GroupOp::Shutdown(reason))
}

fn apply_to_members<L>(
    registry: &GroupRegistry,
    domains: &L,
    dgid: GroupId,
    op: GroupOp,
) -> GroupResult<GroupOpReport>
where
    L: DomainLifecycle + ?Sized,
{
    let mut inner = registry.lock();
    let members = inner.find(dgid)?.members().to_vec();

    let mut report = GroupOpReport::new(dgid, op);
    let mut first_failure: Option<(usize, DomainId, LifecycleError)> = None;

    for (index, &domid) in members.iter().enumerate() {
        if first_failure.is_some() {
            report.push(domid, MemberStatus::NotAttempted);
            continue;
        }

        let result = match op {
            GroupOp::Pause => domains.pause(domid),
            GroupOp::Unpause => domains.unpause(domid),
            GroupOp::Shutdown(reason) => domains.shutdown(domid, reason),
        };

        match result {
            Ok(()) => {
                #[cfg(feature = "verbose_logging")]
                log::trace!(target: "dgroup", "{}: {} {} ok", dgid, op, domid);
                report.push(domid, MemberStatus::Done);
            }
            Err(reason) => {
                report.push(domid, MemberStatus::Failed(reason));
                first_failure = Some((index, domid, reason));
            }
        }
    }

    match first_failure {
        None => {
            info!(target: "dgroup", "{}: {} applied to {} members", dgid, op, members.len());
            Ok(report)
        }
        Some((index, domid, reason)) => {
            inner.count(CountedOp::PartialFailure);
            let failure = PartialFailure {
                dgid,
                op,
                index,
                domid,
                reason,
                report,
            };
            warn!(target: "dgroup", "{}; group left in mixed state", failure);
            Err(failure.into())
        }
    }
}
