//! Folder tree tests

mod common;

use std::collections::HashSet;
use std::time::Duration;

use trelay::errors::TrelayError;
use trelay::services::{CreateFolderRequest, CreateLinkRequest, UpdateFolderRequest};
use trelay::storage::LinkFilter;

use common::{create_request, setup};

fn folder(name: &str, parent_id: Option<i64>) -> CreateFolderRequest {
    CreateFolderRequest {
        name: name.to_string(),
        parent_id,
    }
}

fn move_to(parent_id: Option<i64>) -> UpdateFolderRequest {
    UpdateFolderRequest {
        name: None,
        parent_id: Some(parent_id),
    }
}

#[tokio::test]
async fn test_create_list_rename() {
    let env = setup().await;
    let folders = &env.services.folders;

    let root = folders.create_folder(folder("  Marketing ", None)).await.unwrap();
    assert_eq!(root.name, "Marketing");
    let child = folders
        .create_folder(folder("Campaigns", Some(root.id)))
        .await
        .unwrap();
    assert_eq!(child.parent_id, Some(root.id));

    assert_eq!(folders.list_folders().await.unwrap().len(), 2);

    let renamed = folders
        .update_folder(
            child.id,
            UpdateFolderRequest {
                name: Some("Q3".into()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Q3");
    assert_eq!(renamed.parent_id, Some(root.id));

    let moved = folders
        .update_folder(
            child.id,
            UpdateFolderRequest {
                name: None,
                parent_id: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.parent_id, None);
}

#[tokio::test]
async fn test_missing_parent_is_validation_error() {
    let env = setup().await;
    let err = env
        .services
        .folders
        .create_folder(folder("Orphan", Some(42)))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("parent_id"));
}

#[tokio::test]
async fn test_cycle_rejected() {
    let env = setup().await;
    let folders = &env.services.folders;

    let a = folders.create_folder(folder("A", None)).await.unwrap();
    let b = folders.create_folder(folder("B", Some(a.id))).await.unwrap();
    let c = folders.create_folder(folder("C", Some(b.id))).await.unwrap();

    // A -> C 会形成 A/B/C/A
    let err = folders
        .update_folder(
            a.id,
            UpdateFolderRequest {
                name: None,
                parent_id: Some(Some(c.id)),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TrelayError::Validation { .. }));
    assert_eq!(err.field(), Some("parent_id"));

    let err = folders
        .update_folder(
            b.id,
            UpdateFolderRequest {
                name: None,
                parent_id: Some(Some(b.id)),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("parent_id"));

    // 树结构未改变
    let a = folders.get_folder(a.id).await.unwrap();
    assert_eq!(a.parent_id, None);
}

#[tokio::test]
async fn test_delete_folder_unfiles_links_and_reparents_children() {
    let env = setup().await;
    let folders = &env.services.folders;

    let parent = folders.create_folder(folder("Parent", None)).await.unwrap();
    let doomed = folders
        .create_folder(folder("Doomed", Some(parent.id)))
        .await
        .unwrap();
    let child = folders
        .create_folder(folder("Child", Some(doomed.id)))
        .await
        .unwrap();

    let link = env
        .services
        .links
        .create_link(CreateLinkRequest {
            folder_id: Some(doomed.id),
            ..create_request("https://example.com/filed", Some("filed1"))
        })
        .await
        .unwrap();
    assert_eq!(link.folder_id, Some(doomed.id));

    folders.delete_folder(doomed.id).await.unwrap();

    let link = env.services.links.get_link("filed1", None).await.unwrap();
    assert_eq!(link.folder_id, None);

    let child = folders.get_folder(child.id).await.unwrap();
    assert_eq!(child.parent_id, Some(parent.id));

    let (items, total) = env
        .services
        .links
        .list_links(&LinkFilter {
            folder_id: Some(doomed.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);

    let err = folders.delete_folder(doomed.id).await.unwrap_err();
    assert!(matches!(err, TrelayError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_moves_cannot_form_cycle() {
    let env = setup().await;
    let folders = &env.services.folders;

    let a = folders.create_folder(folder("A", None)).await.unwrap();
    let b = folders.create_folder(folder("B", None)).await.unwrap();

    // A 挂到 B 下，同时 B 挂到 A 下；两者都成功即成环
    let (first, second) = tokio::join!(
        folders.update_folder(a.id, move_to(Some(b.id))),
        folders.update_folder(b.id, move_to(Some(a.id))),
    );
    assert!(
        !(first.is_ok() && second.is_ok()),
        "both moves committed: {:?} / {:?}",
        first,
        second
    );

    // 从任一节点向上走都能到根
    for start in [a.id, b.id] {
        let mut seen = HashSet::new();
        let mut current = Some(start);
        while let Some(id) = current {
            assert!(seen.insert(id), "cycle through folder {}", id);
            current = folders.get_folder(id).await.unwrap().parent_id;
        }
    }
}

#[tokio::test]
async fn test_move_to_missing_parent_rejected() {
    let env = setup().await;
    let folders = &env.services.folders;

    let a = folders.create_folder(folder("A", None)).await.unwrap();
    let err = folders
        .update_folder(a.id, move_to(Some(9999)))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("parent_id"));

    let moved = folders.update_folder(a.id, move_to(None)).await.unwrap();
    assert_eq!(moved.parent_id, None);
}

#[tokio::test]
async fn test_delete_folder_bumps_link_updated_at() {
    let env = setup().await;
    let folders = &env.services.folders;

    let doomed = folders.create_folder(folder("Doomed", None)).await.unwrap();
    let before = env
        .services
        .links
        .create_link(CreateLinkRequest {
            folder_id: Some(doomed.id),
            ..create_request("https://example.com/touched", Some("touched1"))
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    folders.delete_folder(doomed.id).await.unwrap();

    let after = env.services.links.get_link("touched1", None).await.unwrap();
    assert_eq!(after.folder_id, None);
    assert!(after.updated_at > before.updated_at);
}
