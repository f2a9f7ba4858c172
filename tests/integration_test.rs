// ============================================================================
// tests/integration_test.rs - ドメイングループ統合テスト
// ============================================================================

use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

use domgroup::ctl::{GroupCtlOp, GroupCtlRequest, GroupCtlResponse, dispatch};
use domgroup::domain::{DomainState, SimOp};
use domgroup::group::{
    GroupRegistry, create_group, create_named_group, destroy_group, join_group, leave_group,
    list_groups, pause_group, resolve_group, shutdown_group,
};
use domgroup::{
    DomainId, GroupError, GroupHandle, GroupId, GroupName, LifecycleError, MAX_GROUP_SIZE,
    NULL_GROUP_ID, ShutdownReason, SimDomains,
};

// ============================================================================
// ヘルパー
// ============================================================================

fn handle(tag: u8) -> GroupHandle {
    GroupHandle::new([tag; 16])
}

fn send(
    registry: &GroupRegistry,
    sim: &SimDomains,
    op: GroupCtlOp,
) -> Result<GroupCtlResponse, GroupError> {
    dispatch(registry, sim, &GroupCtlRequest::new(op)).map_err(|e| e.error)
}

// ============================================================================
// シナリオ
// ============================================================================

#[test]
fn test_create_join_pause_info_scenario() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains([7]);
    let h1 = handle(0x11);
    let domid = DomainId::new(7);

    let dgid = match send(&registry, &sim, GroupCtlOp::CreateGroup { handle: h1, name: None }) {
        Ok(GroupCtlResponse::Created { dgid }) => dgid,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(dgid, GroupId::new(0));

    assert_eq!(
        send(&registry, &sim, GroupCtlOp::JoinGroup { domid, dgid }),
        Ok(GroupCtlResponse::Done)
    );
    assert_eq!(registry.find(dgid).unwrap().size(), 1);

    assert_eq!(
        send(&registry, &sim, GroupCtlOp::JoinGroup { domid, dgid }),
        Err(GroupError::AlreadyMember { domid, dgid })
    );

    match send(&registry, &sim, GroupCtlOp::PauseGroup { dgid }) {
        Ok(GroupCtlResponse::Applied(report)) => {
            assert_eq!(report.completed(), [domid]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(sim.state(domid), Some(DomainState::Paused));

    match send(&registry, &sim, GroupCtlOp::GetGroupInfo { dgid: GroupId::new(0) }) {
        Ok(GroupCtlResponse::Info(info)) => {
            assert_eq!(info.dgid, GroupId::new(0));
            assert_eq!(info.size, 1);
            assert_eq!(info.members(), &[domid]);
            assert_eq!(info.handle, h1);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_fill_group_then_overflow() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains(100..100 + MAX_GROUP_SIZE as u16 + 1);
    let dgid = create_group(&registry, handle(1)).unwrap();

    for id in 100..100 + MAX_GROUP_SIZE as u16 {
        join_group(&registry, &sim, DomainId::new(id), dgid).unwrap();
    }

    let extra = DomainId::new(100 + MAX_GROUP_SIZE as u16);
    assert_eq!(
        join_group(&registry, &sim, extra, dgid),
        Err(GroupError::CapacityExceeded(dgid))
    );
    assert_eq!(registry.find(dgid).unwrap().size(), MAX_GROUP_SIZE);
}

#[test]
fn test_destroy_middle_group_then_enumerate() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::new();
    for tag in 0..3 {
        create_group(&registry, handle(tag)).unwrap();
    }
    destroy_group(&registry, &sim, GroupId::new(1)).unwrap();

    let ids: Vec<GroupId> = list_groups(&registry, GroupId::new(0), 10)
        .iter()
        .map(|info| info.dgid)
        .collect();
    assert_eq!(ids, [GroupId::new(0), GroupId::new(2)]);
}

#[test]
fn test_named_group_resolved_by_text_then_shut_down() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains([20, 21]);
    let uuid = "9b2f4c1e-7a3d-4e6f-8c5b-1d2e3f4a5b6c";
    let dgid = create_named_group(
        &registry,
        GroupHandle::parse(uuid).unwrap(),
        GroupName::new("cluster-a").unwrap(),
    )
    .unwrap();
    for id in [20, 21] {
        join_group(&registry, &sim, DomainId::new(id), dgid).unwrap();
    }

    for text in ["cluster-a", "0", uuid] {
        let info = resolve_group(&registry, text).unwrap();
        assert_eq!(info.dgid, dgid);
        assert_eq!(info.handle.to_string(), uuid);
    }

    let report = shutdown_group(&registry, &sim, dgid, ShutdownReason::Poweroff).unwrap();
    assert_eq!(report.completed(), [DomainId::new(20), DomainId::new(21)]);
    destroy_group(&registry, &sim, dgid).unwrap();
    assert!(matches!(
        resolve_group(&registry, "cluster-a"),
        Err(GroupError::NoMatch(_))
    ));
}

#[test]
fn test_group_recovers_after_failed_destroy_rollback() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains([1, 2]);
    let dgid = create_group(&registry, handle(4)).unwrap();
    join_group(&registry, &sim, DomainId::new(1), dgid).unwrap();
    join_group(&registry, &sim, DomainId::new(2), dgid).unwrap();
    sim.inject_fault(DomainId::new(2), SimOp::Detach, LifecycleError::Busy);
    sim.inject_fault(DomainId::new(1), SimOp::Attach, LifecycleError::Refused);

    assert!(matches!(
        send(&registry, &sim, GroupCtlOp::DestroyGroup { dgid }),
        Err(GroupError::DetachFailed { .. })
    ));
    sim.clear_faults(DomainId::new(1));
    sim.clear_faults(DomainId::new(2));

    // 戻せなかったメンバーも離脱でき、その後の破棄も通る
    assert_eq!(
        send(&registry, &sim, GroupCtlOp::LeaveGroup { domid: DomainId::new(1) }),
        Ok(GroupCtlResponse::Left { dgid })
    );
    assert_eq!(
        send(&registry, &sim, GroupCtlOp::DestroyGroup { dgid }),
        Ok(GroupCtlResponse::Done)
    );
    assert_eq!(sim.group_of(DomainId::new(2)), Some(NULL_GROUP_ID));
    assert!(registry.is_empty());
}

// ============================================================================
// 性質
// ============================================================================

#[test]
fn test_live_ids_are_unique_and_assignable() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::new();
    let mut live = BTreeSet::new();

    for round in 0..200u16 {
        let dgid = create_group(&registry, handle(0)).unwrap();
        assert!(dgid.is_assignable());
        assert!(live.insert(dgid), "duplicate live id {}", dgid);

        if round % 3 == 0 {
            let victim = *live.iter().next().unwrap();
            destroy_group(&registry, &sim, victim).unwrap();
            live.remove(&victim);
        }
    }

    let listed: BTreeSet<GroupId> = list_groups(&registry, GroupId::new(0), usize::MAX)
        .iter()
        .map(|info| info.dgid)
        .collect();
    assert_eq!(listed, live);
    assert_eq!(registry.stats().groups, live.len());
}

#[test]
fn test_enumeration_is_strictly_increasing_and_bounded() {
    let registry = GroupRegistry::new();
    assert!(list_groups(&registry, GroupId::new(0), 5).is_empty());

    for _ in 0..12 {
        create_group(&registry, handle(0)).unwrap();
    }
    let infos = list_groups(&registry, GroupId::new(0), 5);
    assert_eq!(infos.len(), 5);
    assert!(infos.windows(2).all(|w| w[0].dgid < w[1].dgid));
}

#[test]
fn test_destroy_failure_keeps_group_and_members() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains([1, 2]);
    let dgid = create_group(&registry, handle(2)).unwrap();
    join_group(&registry, &sim, DomainId::new(1), dgid).unwrap();
    join_group(&registry, &sim, DomainId::new(2), dgid).unwrap();
    sim.inject_fault(DomainId::new(2), SimOp::Detach, LifecycleError::Busy);

    assert!(matches!(
        send(&registry, &sim, GroupCtlOp::DestroyGroup { dgid }),
        Err(GroupError::DetachFailed { .. })
    ));
    assert_eq!(
        registry.find(dgid).unwrap().members(),
        &[DomainId::new(1), DomainId::new(2)]
    );
    assert_eq!(sim.group_of(DomainId::new(1)), Some(dgid));

    sim.clear_faults(DomainId::new(2));
    destroy_group(&registry, &sim, dgid).unwrap();
    assert_eq!(sim.group_of(DomainId::new(1)), Some(NULL_GROUP_ID));
    assert_eq!(sim.group_of(DomainId::new(2)), Some(NULL_GROUP_ID));
}

#[test]
fn test_partial_pause_reports_failing_member() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains([1, 2, 3]);
    let dgid = create_group(&registry, handle(3)).unwrap();
    for id in [1, 2, 3] {
        join_group(&registry, &sim, DomainId::new(id), dgid).unwrap();
    }
    sim.inject_fault(DomainId::new(3), SimOp::Pause, LifecycleError::Refused);

    match pause_group(&registry, &sim, dgid) {
        Err(GroupError::PartialFailure(pf)) => {
            assert_eq!(pf.dgid, dgid);
            assert_eq!(pf.domid, DomainId::new(3));
            assert_eq!(pf.index, 2);
            assert_eq!(pf.completed(), [DomainId::new(1), DomainId::new(2)]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_leave_and_join_elsewhere_through_ctl() {
    let registry = GroupRegistry::new();
    let sim = SimDomains::with_domains([9]);
    let a = create_group(&registry, handle(0xA)).unwrap();
    let b = create_group(&registry, handle(0xB)).unwrap();
    let domid = DomainId::new(9);

    join_group(&registry, &sim, domid, a).unwrap();
    assert_eq!(
        send(&registry, &sim, GroupCtlOp::LeaveGroup { domid }),
        Ok(GroupCtlResponse::Left { dgid: a })
    );
    assert_eq!(leave_group(&registry, &sim, domid), Err(GroupError::NotMember(domid)));
    join_group(&registry, &sim, domid, b).unwrap();
    assert_eq!(registry.group_of(domid), Some(b));
}

// ============================================================================
// 並行性
// ============================================================================

#[test]
fn test_concurrent_joins_respect_capacity() {
    const THREADS: usize = 8;
    const PER_THREAD: u16 = 6;

    let registry = Arc::new(GroupRegistry::new());
    let sim = Arc::new(SimDomains::with_domains(0..THREADS as u16 * PER_THREAD));
    let dgid = create_group(&registry, handle(0)).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS as u16)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let sim = Arc::clone(&sim);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut joined = 0usize;
                for i in 0..PER_THREAD {
                    let domid = DomainId::new(t * PER_THREAD + i);
                    match join_group(&registry, &*sim, domid, dgid) {
                        Ok(()) => joined += 1,
                        Err(GroupError::CapacityExceeded(_)) => {}
                        Err(e) => panic!("unexpected error {:?}", e),
                    }
                }
                joined
            })
        })
        .collect();

    let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(total, MAX_GROUP_SIZE);

    let group = registry.find(dgid).unwrap();
    assert_eq!(group.size(), MAX_GROUP_SIZE);
    for &domid in group.members() {
        assert_eq!(sim.group_of(domid), Some(dgid));
    }
}

#[test]
fn test_concurrent_create_destroy_keeps_ids_unique() {
    let registry = Arc::new(GroupRegistry::new());
    let sim = Arc::new(SimDomains::new());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let sim = Arc::clone(&sim);
            thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..50 {
                    let dgid = create_group(&registry, handle(0)).unwrap();
                    if i % 2 == 0 {
                        destroy_group(&registry, &*sim, dgid).unwrap();
                    } else {
                        kept.push(dgid);
                    }
                }
                kept
            })
        })
        .collect();

    let mut all = BTreeSet::new();
    for worker in workers {
        for dgid in worker.join().unwrap() {
            assert!(all.insert(dgid), "id {} handed out twice", dgid);
        }
    }
    assert_eq!(registry.len(), all.len());
}
