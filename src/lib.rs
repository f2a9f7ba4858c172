// ============================================================================
// src/lib.rs - Domain Group Control Plane
// ============================================================================
//!
//! # ドメイングループ管理
//!
//! 仮想化ホスト上の実行ドメイン（仮想マシン）を「グループ」単位で束ね、
//! 一時停止・再開・破棄といった管理操作をグループ全体に適用するための
//! コントロールプレーン部品。
//!
//! ## 構成
//!
//! ```text
//! ctl (制御リクエスト)
//!  └─ group::lifecycle / group::membership / group::enumerate / group::lookup
//!       └─ group::registry (GroupRegistry: id割り当て + 逆引き表)
//!            └─ group::types (GroupId, DomainId, GroupHandle, DomainGroup)
//! domain (外部ドメインライフサイクルへの境界)
//! ```
//!
//! ドメイン自体の生成・スケジューリングは外部サブシステムの責務であり、
//! 本クレートは [`domain::DomainLifecycle`] トレイト越しにのみ触れる。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod ctl;
pub mod domain;
pub mod error;
pub mod group;

pub use ctl::{DOMGRP_INTERFACE_VERSION, GroupCtlOp, GroupCtlRequest, GroupCtlResponse, dispatch};
pub use domain::{DomainLifecycle, ShutdownReason, SimDomains};
pub use error::{GroupError, GroupResult, LifecycleError, NameError};
pub use group::{
    DomainGroup, DomainId, GroupHandle, GroupId, GroupInfo, GroupKey, GroupName, GroupOpReport,
    GroupRegistry, GroupStats, INVAL_GROUP_ID, MAX_GROUP_SIZE, NULL_GROUP_ID,
};
