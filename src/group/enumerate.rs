// ============================================================================
// src/group/enumerate.rs - Enumeration Service
// ============================================================================
//!
//! 指定IDからのグループ一覧取得。
//!
//! 1件ごとにレジストリをロックしてスナップショットを取るため、
//! 各要素はその時点の状態を表すが、一覧全体としての一貫性はない。
//! 走査中に破棄されたグループは次のステップで単に現れず、
//! 途中で作成されたグループはカーソルとの位置関係次第で現れる。

use alloc::vec::Vec;

use super::registry::GroupRegistry;
use super::types::{GroupId, GroupInfo};

/// グループ情報の遅延イテレータ
///
/// 有限で、巻き戻しはできない。
pub struct GroupInfoIter<'a> {
    registry: &'a GroupRegistry,
    cursor: Option<GroupId>,
    remaining: usize,
}

impl Iterator for GroupInfoIter<'_> {
    type Item = GroupInfo;

    fn next(&mut self) -> Option<GroupInfo> {
        if self.remaining == 0 {
            return None;
        }
        let cursor = self.cursor?;

        let info = self.registry.lock().next_from(cursor).map(|g| g.info());
        match info {
            Some(info) => {
                self.remaining -= 1;
                self.cursor = info
                    .dgid
                    .as_u16()
                    .checked_add(1)
                    .map(GroupId::new);
                Some(info)
            }
            None => {
                self.cursor = None;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            Some(_) => (0, Some(self.remaining)),
            None => (0, Some(0)),
        }
    }
}

/// `first` 以上のIDを持つグループを昇順に最大 `max_results` 件列挙
pub fn group_info(registry: &GroupRegistry, first: GroupId, max_results: usize) -> GroupInfoIter<'_> {
    GroupInfoIter {
        registry,
        cursor: Some(first),
        remaining: max_results,
    }
}

/// [`group_info`] の結果を収集（レジストリが空なら空のVec）
pub fn list_groups(registry: &GroupRegistry, first: GroupId, max_results: usize) -> Vec<GroupInfo> {
    group_info(registry, first, max_results).collect()
}
