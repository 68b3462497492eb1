//! Bulk delete / restore tests

mod common;

use trelay::services::{BulkDeleteResult, BulkRestoreResult};

use common::{create_link, setup};

fn slugs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_bulk_delete_partitions_results() {
    let env = setup().await;
    create_link(&env, "aaaa").await;
    create_link(&env, "bbbb").await;

    let result = env
        .services
        .bulk
        .bulk_delete(&slugs(&["aaaa", "bbbb", "nonexistent"]), None, false)
        .await
        .unwrap();
    assert_eq!(
        result,
        BulkDeleteResult {
            deleted: slugs(&["aaaa", "bbbb"]),
            failed: slugs(&["nonexistent"]),
        }
    );

    // 第二次删除全部失败
    let again = env
        .services
        .bulk
        .bulk_delete(&slugs(&["aaaa", "bbbb"]), None, false)
        .await
        .unwrap();
    assert!(again.deleted.is_empty());
    assert_eq!(again.failed.len(), 2);
}

#[tokio::test]
async fn test_bulk_restore() {
    let env = setup().await;
    create_link(&env, "keep01").await;
    create_link(&env, "trash1").await;
    env.services
        .links
        .delete_link("trash1", None, false)
        .await
        .unwrap();

    let result = env
        .services
        .bulk
        .bulk_restore(&slugs(&["trash1", "keep01", "trash1"]), None)
        .await
        .unwrap();
    assert_eq!(
        result,
        BulkRestoreResult {
            restored: slugs(&["trash1"]),
            failed: slugs(&["keep01"]),
        }
    );
}

#[tokio::test]
async fn test_bulk_permanent_delete() {
    let env = setup().await;
    for slug in ["perm01", "perm02"] {
        create_link(&env, slug).await;
    }

    let result = env
        .services
        .bulk
        .bulk_delete(&slugs(&["perm01", "perm02"]), None, true)
        .await
        .unwrap();
    assert_eq!(result.deleted.len(), 2);

    let restored = env
        .services
        .bulk
        .bulk_restore(&slugs(&["perm01", "perm02"]), None)
        .await
        .unwrap();
    assert!(restored.restored.is_empty());
    assert_eq!(restored.failed.len(), 2);
}

#[tokio::test]
async fn test_bulk_rejects_empty_and_oversized() {
    let env = setup().await;

    let err = env
        .services
        .bulk
        .bulk_delete(&[], None, false)
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("slugs"));

    let too_many: Vec<String> = (0..101).map(|i| format!("slug{}", i)).collect();
    let err = env
        .services
        .bulk
        .bulk_restore(&too_many, None)
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("slugs"));
}
