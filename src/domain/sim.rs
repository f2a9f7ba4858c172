// ============================================================================
// src/domain/sim.rs - インメモリのドメインライフサイクル実装
// ============================================================================
//!
//! 実際のハイパーバイザを持たない環境（テスト、デモ）向けの
//! [`DomainLifecycle`] 実装。操作ごとに失敗を注入できる。

use alloc::collections::BTreeMap;
use spin::Mutex;

use super::{DomainLifecycle, ShutdownReason};
use crate::error::LifecycleError;
use crate::group::types::{DomainId, GroupId, NULL_GROUP_ID};

/// ドメインの実行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    /// 実行中
    Running,
    /// 一時停止
    Paused,
    /// シャットダウン要求済み
    ShuttingDown(ShutdownReason),
}

/// 失敗注入の対象となる操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimOp {
    Attach,
    Detach,
    Pause,
    Unpause,
    Shutdown,
}

#[derive(Debug, Clone)]
struct SimDomain {
    state: DomainState,
    group: GroupId,
    faults: BTreeMap<SimOp, LifecycleError>,
}

impl SimDomain {
    fn new() -> Self {
        Self {
            state: DomainState::Running,
            group: NULL_GROUP_ID,
            faults: BTreeMap::new(),
        }
    }

    fn check(&self, op: SimOp) -> Result<(), LifecycleError> {
        match self.faults.get(&op) {
            Some(&err) => Err(err),
            None => Ok(()),
        }
    }
}

/// インメモリのドメイン表
pub struct SimDomains {
    domains: Mutex<BTreeMap<DomainId, SimDomain>>,
}

impl SimDomains {
    pub const fn new() -> Self {
        Self {
            domains: Mutex::new(BTreeMap::new()),
        }
    }

    /// 指定IDのドメイン群で初期化
    pub fn with_domains<I: IntoIterator<Item = u16>>(ids: I) -> Self {
        let sim = Self::new();
        for id in ids {
            sim.add_domain(DomainId::new(id));
        }
        sim
    }

    /// 実行中のドメインを追加
    pub fn add_domain(&self, domid: DomainId) {
        self.domains.lock().insert(domid, SimDomain::new());
    }

    /// ドメインを消滅させる（外部での破棄を模擬）
    pub fn remove_domain(&self, domid: DomainId) -> bool {
        self.domains.lock().remove(&domid).is_some()
    }

    pub fn state(&self, domid: DomainId) -> Option<DomainState> {
        self.domains.lock().get(&domid).map(|d| d.state)
    }

    /// ドメイン側が保持しているグループ逆参照
    pub fn group_of(&self, domid: DomainId) -> Option<GroupId> {
        self.domains.lock().get(&domid).map(|d| d.group)
    }

    /// 次回以降の操作を失敗させる
    pub fn inject_fault(&self, domid: DomainId, op: SimOp, err: LifecycleError) {
        if let Some(domain) = self.domains.lock().get_mut(&domid) {
            domain.faults.insert(op, err);
        }
    }

    /// 注入した失敗をすべて解除
    pub fn clear_faults(&self, domid: DomainId) {
        if let Some(domain) = self.domains.lock().get_mut(&domid) {
            domain.faults.clear();
        }
    }

    fn with_domain<F, R>(&self, domid: DomainId, f: F) -> Result<R, LifecycleError>
    where
        F: FnOnce(&mut SimDomain) -> Result<R, LifecycleError>,
    {
        let mut domains = self.domains.lock();
        let domain = domains
            .get_mut(&domid)
            .ok_or(LifecycleError::NoSuchDomain)?;
        f(domain)
    }
}

impl Default for SimDomains {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainLifecycle for SimDomains {
    fn locate(&self, domid: DomainId) -> Result<(), LifecycleError> {
        self.with_domain(domid, |_| Ok(()))
    }

    fn current_group(&self, domid: DomainId) -> Result<GroupId, LifecycleError> {
        self.with_domain(domid, |d| Ok(d.group))
    }

    fn attach(&self, domid: DomainId, dgid: GroupId) -> Result<(), LifecycleError> {
        self.with_domain(domid, |d| {
            d.check(SimOp::Attach)?;
            if d.group != NULL_GROUP_ID && d.group != dgid {
                return Err(LifecycleError::Refused);
            }
            d.group = dgid;
            Ok(())
        })
    }

    fn detach(&self, domid: DomainId, dgid: GroupId) -> Result<(), LifecycleError> {
        self.with_domain(domid, |d| {
            d.check(SimOp::Detach)?;
            if d.group != dgid {
                return Err(LifecycleError::Refused);
            }
            d.group = NULL_GROUP_ID;
            Ok(())
        })
    }

    fn pause(&self, domid: DomainId) -> Result<(), LifecycleError> {
        self.with_domain(domid, |d| {
            d.check(SimOp::Pause)?;
            d.state = DomainState::Paused;
            Ok(())
        })
    }

    fn unpause(&self, domid: DomainId) -> Result<(), LifecycleError> {
        self.with_domain(domid, |d| {
            d.check(SimOp::Unpause)?;
            d.state = DomainState::Running;
            Ok(())
        })
    }

    fn shutdown(&self, domid: DomainId, reason: ShutdownReason) -> Result<(), LifecycleError> {
        self.with_domain(domid, |d| {
            d.check(SimOp::Shutdown)?;
            d.state = DomainState::ShuttingDown(reason);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_detach() {
        let sim = SimDomains::with_domains([1]);
        let domid = DomainId::new(1);
        let dgid = GroupId::new(2);

        assert_eq!(sim.current_group(domid), Ok(NULL_GROUP_ID));
        sim.attach(domid, dgid).unwrap();
        assert_eq!(sim.current_group(domid), Ok(dgid));

        // 別グループへの付け替えは拒否
        assert_eq!(
            sim.attach(domid, GroupId::new(3)),
            Err(LifecycleError::Refused)
        );

        sim.detach(domid, dgid).unwrap();
        assert_eq!(sim.group_of(domid), Some(NULL_GROUP_ID));
    }

    #[test]
    fn test_fault_injection() {
        let sim = SimDomains::with_domains([1]);
        let domid = DomainId::new(1);

        sim.inject_fault(domid, SimOp::Pause, LifecycleError::Busy);
        assert_eq!(sim.pause(domid), Err(LifecycleError::Busy));
        assert_eq!(sim.state(domid), Some(DomainState::Running));

        sim.clear_faults(domid);
        sim.pause(domid).unwrap();
        assert_eq!(sim.state(domid), Some(DomainState::Paused));

        // 再開は冪等
        sim.unpause(domid).unwrap();
        sim.unpause(domid).unwrap();
        assert_eq!(sim.state(domid), Some(DomainState::Running));
    }

    #[test]
    fn test_shutdown_records_reason() {
        let sim = SimDomains::with_domains([4]);
        let domid = DomainId::new(4);

        sim.shutdown(domid, ShutdownReason::Reboot).unwrap();
        assert_eq!(
            sim.state(domid),
            Some(DomainState::ShuttingDown(ShutdownReason::Reboot))
        );

        sim.inject_fault(domid, SimOp::Shutdown, LifecycleError::Busy);
        assert_eq!(
            sim.shutdown(domid, ShutdownReason::Halt),
            Err(LifecycleError::Busy)
        );
    }

    #[test]
    fn test_unknown_domain() {
        let sim = SimDomains::new();
        assert_eq!(
            sim.locate(DomainId::new(9)),
            Err(LifecycleError::NoSuchDomain)
        );
    }
}
