// ============================================================================
// src/group/mod.rs - Domain Group Management
// ============================================================================
pub mod enumerate;
pub mod lifecycle;
pub mod lookup;
pub mod membership;
pub mod registry;
pub mod types;

pub use enumerate::{GroupInfoIter, group_info, list_groups};
pub use lifecycle::{
    GroupOp, GroupOpReport, MemberOutcome, MemberStatus, create_group, create_named_group,
    destroy_group, pause_group, shutdown_group, unpause_group,
};
pub use lookup::{GroupKey, group_members, lookup_group, resolve_group};
pub use membership::{forget_domain, join_group, leave_group};
#[cfg(feature = "stats")]
pub use registry::OpCounters;
pub use registry::{GroupRegistry, GroupStats};
pub use types::{
    DomainGroup, DomainId, GROUP_HANDLE_LEN, GroupHandle, GroupId, GroupInfo, GroupName,
    INVAL_GROUP_ID, MAX_GROUP_SIZE, NULL_GROUP_ID,
};
