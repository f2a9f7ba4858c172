// ============================================================================
// src/ctl.rs - Group Control Requests
// ============================================================================
//!
//! 制御リクエスト層からの1コマンド=1呼び出しの入口。
//!
//! すべてのリクエストはインターフェースバージョンを持ち、未知の
//! バージョンは状態に一切触れる前に拒否する。

use alloc::vec::Vec;
use log::{debug, warn};

use crate::domain::{DomainLifecycle, ShutdownReason};
use crate::error::{ContextualError, ErrorContext, GroupError};
use crate::group::{
    self, DomainId, GroupHandle, GroupId, GroupInfo, GroupKey, GroupName, GroupOpReport,
    GroupRegistry,
};

/// インターフェースバージョン
pub const DOMGRP_INTERFACE_VERSION: u32 = 0x0000_0001;

/// コマンド本体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCtlOp {
    CreateGroup {
        handle: GroupHandle,
        name: Option<GroupName>,
    },
    JoinGroup { domid: DomainId, dgid: GroupId },
    LeaveGroup { domid: DomainId },
    PauseGroup { dgid: GroupId },
    UnpauseGroup { dgid: GroupId },
    ShutdownGroup { dgid: GroupId, reason: ShutdownReason },
    DestroyGroup { dgid: GroupId },
    /// `dgid` は列挙カーソル（そのID以上で最小のグループを返す）
    GetGroupInfo { dgid: GroupId },
    LookupGroup { key: GroupKey },
    GetGroupMembers { dgid: GroupId },
}

impl GroupCtlOp {
    pub const fn name(&self) -> &'static str {
        match self {
            GroupCtlOp::CreateGroup { .. } => "CreateGroup",
            GroupCtlOp::JoinGroup { .. } => "JoinGroup",
            GroupCtlOp::LeaveGroup { .. } => "LeaveGroup",
            GroupCtlOp::PauseGroup { .. } => "PauseGroup",
            GroupCtlOp::UnpauseGroup { .. } => "UnpauseGroup",
            GroupCtlOp::ShutdownGroup { .. } => "ShutdownGroup",
            GroupCtlOp::DestroyGroup { .. } => "DestroyGroup",
            GroupCtlOp::GetGroupInfo { .. } => "GetGroupInfo",
            GroupCtlOp::LookupGroup { .. } => "LookupGroup",
            GroupCtlOp::GetGroupMembers { .. } => "GetGroupMembers",
        }
    }
}

/// 制御リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCtlRequest {
    pub interface_version: u32,
    pub op: GroupCtlOp,
}

impl GroupCtlRequest {
    /// 現行バージョンのリクエストを作成
    pub fn new(op: GroupCtlOp) -> Self {
        Self {
            interface_version: DOMGRP_INTERFACE_VERSION,
            op,
        }
    }
}

/// 制御レスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCtlResponse {
    /// CreateGroup
    Created { dgid: GroupId },
    /// LeaveGroup: 離脱したグループ
    Left { dgid: GroupId },
    /// PauseGroup / UnpauseGroup / ShutdownGroup
    Applied(GroupOpReport),
    /// GetGroupInfo / LookupGroup
    Info(GroupInfo),
    /// GetGroupMembers
    Members(Vec<DomainId>),
    /// JoinGroup / DestroyGroup
    Done,
}

/// リクエストを実行
///
/// エラーにはコマンド名がコンテキストとして付く。
pub fn dispatch<L>(
    registry: &GroupRegistry,
    domains: &L,
    request: &GroupCtlRequest,
) -> Result<GroupCtlResponse, ContextualError>
where
    L: DomainLifecycle + ?Sized,
{
    let command = request.op.name();

    if request.interface_version != DOMGRP_INTERFACE_VERSION {
        warn!(
            target: "dgroup",
            "{} rejected: interface version {:#010x}", command, request.interface_version
        );
        return Err(GroupError::VersionMismatch {
            expected: DOMGRP_INTERFACE_VERSION,
            found: request.interface_version,
        })
        .context(command);
    }

    debug!(target: "dgroup", "dispatch {:?}", request.op);

    let result = match &request.op {
        GroupCtlOp::CreateGroup { handle, name } => {
            let created = match name {
                Some(name) => group::create_named_group(registry, *handle, name.clone()),
                None => group::create_group(registry, *handle),
            };
            created.map(|dgid| GroupCtlResponse::Created { dgid })
        }
        GroupCtlOp::JoinGroup { domid, dgid } => {
            group::join_group(registry, domains, *domid, *dgid).map(|()| GroupCtlResponse::Done)
        }
        GroupCtlOp::LeaveGroup { domid } => group::leave_group(registry, domains, *domid)
            .map(|dgid| GroupCtlResponse::Left { dgid }),
        GroupCtlOp::PauseGroup { dgid } => {
            group::pause_group(registry, domains, *dgid).map(GroupCtlResponse::Applied)
        }
        GroupCtlOp::UnpauseGroup { dgid } => {
            group::unpause_group(registry, domains, *dgid).map(GroupCtlResponse::Applied)
        }
        GroupCtlOp::ShutdownGroup { dgid, reason } => {
            group::shutdown_group(registry, domains, *dgid, *reason).map(GroupCtlResponse::Applied)
        }
        GroupCtlOp::DestroyGroup { dgid } => {
            group::destroy_group(registry, domains, *dgid).map(|()| GroupCtlResponse::Done)
        }
        GroupCtlOp::GetGroupInfo { dgid } => group::group_info(registry, *dgid, 1)
            .next()
            .map(GroupCtlResponse::Info)
            .ok_or(GroupError::GroupNotFound(*dgid)),
        GroupCtlOp::LookupGroup { key } => {
            group::lookup_group(registry, key).map(GroupCtlResponse::Info)
        }
        GroupCtlOp::GetGroupMembers { dgid } => {
            group::group_members(registry, *dgid).map(GroupCtlResponse::Members)
        }
    };
    result.context(command)
}
