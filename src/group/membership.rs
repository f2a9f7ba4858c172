// ============================================================================
// src/group/membership.rs - Membership Operations
// ドメインのグループへの参加・離脱
// ============================================================================

use log::debug;

use super::registry::{CountedOp, GroupRegistry};
use super::types::{DomainId, GroupId, NULL_GROUP_ID};
use crate::domain::DomainLifecycle;
use crate::error::{GroupError, GroupResult, LifecycleError};

/// ドメインをグループに参加させる
///
/// 判定順: グループの存在 → ドメインの存在 → 空き容量 → 既存の所属。
/// 予約領域のドメインIDは存在しないドメインとして扱う。
/// 所属の判定はドメイン側が持つ逆参照を正とする。
pub fn join_group<L>(
    registry: &GroupRegistry,
    domains: &L,
    domid: DomainId,
    dgid: GroupId,
) -> GroupResult<()>
where
    L: DomainLifecycle + ?Sized,
{
    let mut inner = registry.lock();
    let full = inner.find(dgid)?.is_full();

    if domid.is_reserved() {
        return Err(GroupError::DomainNotFound(domid));
    }
    domains
        .locate(domid)
        .map_err(|e| GroupError::from_lifecycle(domid, e))?;

    if full {
        return Err(GroupError::CapacityExceeded(dgid));
    }

    let current = domains
        .current_group(domid)
        .map_err(|e| GroupError::from_lifecycle(domid, e))?;
    if current != NULL_GROUP_ID {
        return Err(GroupError::AlreadyMember {
            domid,
            dgid: current,
        });
    }
    if let Some(existing) = inner.group_of(domid) {
        return Err(GroupError::AlreadyMember {
            domid,
            dgid: existing,
        });
    }

    domains
        .attach(domid, dgid)
        .map_err(|e| GroupError::from_lifecycle(domid, e))?;

    let added = inner.find_mut(dgid)?.add_member(domid);
    debug_assert!(added, "{} passed join checks but was not added to {}", domid, dgid);
    inner.link(domid, dgid);
    inner.count(CountedOp::Join);

    debug!(target: "dgroup", "{} joined {}", domid, dgid);
    Ok(())
}

/// ドメインを現在のグループから離脱させる
///
/// 離脱したグループのIDを返す。グループが空になっても破棄はしない。
pub fn leave_group<L>(registry: &GroupRegistry, domains: &L, domid: DomainId) -> GroupResult<GroupId>
where
    L: DomainLifecycle + ?Sized,
{
    let mut inner = registry.lock();
    let dgid = inner.group_of(domid).ok_or(GroupError::NotMember(domid))?;

    release(domains, domid, dgid).map_err(|e| GroupError::from_lifecycle(domid, e))?;

    inner.find_mut(dgid)?.remove_member(domid);
    inner.unlink(domid);
    inner.count(CountedOp::Leave);

    debug!(target: "dgroup", "{} left {}", domid, dgid);
    Ok(dgid)
}

/// ドメイン側のグループ逆参照を外す
///
/// ドメイン側が既にどのグループにも属していなければ切り離しは呼ばず
/// `Ok(false)` を返す。破棄のロールバックで戻せなかったメンバーも
/// この経路で外せる。
pub(crate) fn release<L>(domains: &L, domid: DomainId, dgid: GroupId) -> Result<bool, LifecycleError>
where
    L: DomainLifecycle + ?Sized,
{
    if domains.current_group(domid)? == NULL_GROUP_ID {
        return Ok(false);
    }
    domains.detach(domid, dgid)?;
    Ok(true)
}

/// 既に消滅したドメインをグループから外す
///
/// ドメイン側には触れない。所属していたグループのIDを返す。
pub fn forget_domain(registry: &GroupRegistry, domid: DomainId) -> Option<GroupId> {
    let mut inner = registry.lock();
    let dgid = inner.unlink(domid)?;
    if let Ok(group) = inner.find_mut(dgid) {
        group.remove_member(domid);
    }
    inner.count(CountedOp::Leave);

    debug!(target: "dgroup", "{} dropped from {} (domain gone)", domid, dgid);
    Some(dgid)
}
