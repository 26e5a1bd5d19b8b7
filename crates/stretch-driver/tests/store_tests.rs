//! 状态存储属性与并发测试

use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use stretch_driver::{DriverError, StatusStore};
use stretch_status::{CompositeStatus, Subsystem, SubsystemStatus};

/// 所有子系统写入同一标记值的快照
fn uniform_snapshot(marker: u64) -> CompositeStatus {
    let mut status = CompositeStatus::default();
    for subsystem in Subsystem::ALL {
        status.set(subsystem, SubsystemStatus(json!({ "marker": marker })));
    }
    status
}

fn markers(status: &CompositeStatus) -> Vec<Option<u64>> {
    Subsystem::ALL
        .iter()
        .map(|s| status.get(*s).field("marker").and_then(|v| v.as_u64()))
        .collect()
}

proptest! {
    /// 追加 N 次后保留 min(N, C) 条，id 为以 N 结尾的连续整数
    #[test]
    fn ring_retains_latest_consecutive_ids(capacity in 1usize..40, appends in 0u64..120) {
        let store = StatusStore::new(capacity);
        for i in 1..=appends {
            prop_assert_eq!(store.append(uniform_snapshot(i)), i);
        }

        let retained = appends.min(capacity as u64);
        prop_assert_eq!(store.len() as u64, retained);
        let expected: Vec<u64> = (appends - retained + 1..=appends).collect();
        prop_assert_eq!(store.ids(), expected);
    }

    /// 窗口内按 id 取回原快照，窗口外返回 NotFound
    #[test]
    fn by_id_matches_window(capacity in 1usize..30, appends in 1u64..80, probe in 0u64..100) {
        let store = StatusStore::new(capacity);
        for i in 1..=appends {
            store.append(uniform_snapshot(i));
        }
        let oldest = appends.saturating_sub(capacity as u64) + 1;

        match store.by_id(probe) {
            Ok(status) => {
                prop_assert!(probe >= oldest && probe <= appends);
                prop_assert_eq!(markers(&status), vec![Some(probe); Subsystem::ALL.len()]);
            },
            Err(DriverError::StatusNotFound { id, .. }) => {
                prop_assert_eq!(id, probe);
                prop_assert!(probe < oldest || probe > appends);
            },
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }
}

#[test]
fn test_concurrent_reads_never_observe_torn_snapshots() {
    let store = Arc::new(StatusStore::new(25));
    let writers = 2;
    let appends_per_writer = 500;

    thread::scope(|scope| {
        for w in 0..writers {
            let store = store.clone();
            scope.spawn(move || {
                for i in 0..appends_per_writer {
                    store.append(uniform_snapshot(w * 10_000 + i + 1));
                }
            });
        }
        // 合并写入：读取最新并原子地改写全部子系统
        let merger = store.clone();
        scope.spawn(move || {
            for i in 0..appends_per_writer {
                let marker = 1_000_000 + i;
                merger.merge_latest(|status| *status = uniform_snapshot(marker));
            }
        });

        for _ in 0..4 {
            let store = store.clone();
            scope.spawn(move || {
                for _ in 0..2_000 {
                    let status = store.latest();
                    let seen = markers(&status);
                    assert!(
                        seen.iter().all(|m| *m == seen[0]),
                        "torn snapshot: {:?}",
                        seen
                    );
                }
            });
        }
    });

    assert_eq!(store.newest_id(), Some(3 * 500));
    assert_eq!(store.len(), 25);
}

#[test]
fn test_stored_snapshot_is_immutable() {
    let store = StatusStore::new(5);
    let id = store.append(uniform_snapshot(7));

    let mut copy = store.by_id(id).unwrap();
    copy.lift = SubsystemStatus(json!({ "marker": 99 }));
    store.merge_latest(|status| status.arm = SubsystemStatus(json!({ "marker": 42 })));

    let again = store.by_id(id).unwrap();
    assert_eq!(markers(&again), vec![Some(7); Subsystem::ALL.len()]);
}
