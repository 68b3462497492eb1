//! LinkService tests
//!
//! Create / get / update / list against a real SQLite database.

mod common;

use chrono::Utc;
use trelay::errors::TrelayError;
use trelay::services::{CreateLinkRequest, CreateFolderRequest, UpdateLinkRequest};
use trelay::storage::LinkFilter;

use common::{create_link, create_request, setup};

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let env = setup().await;

    let created = env
        .services
        .links
        .create_link(CreateLinkRequest {
            url: "example.com/docs".into(),
            slug: Some("Docs-2026".into()),
            tags: Some(vec!["Work".into(), "work".into(), " rust ".into()]),
            ttl_hours: Some(24),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.slug, "docs-2026");
    assert_eq!(created.original_url, "https://example.com/docs");
    assert_eq!(created.domain, None);
    // 标签去重后按字典序存储
    assert_eq!(created.tags, vec!["rust", "work"]);
    assert_eq!(created.click_count, 0);
    assert!(!created.has_password);
    assert!(created.expires_at.is_some_and(|exp| exp > Utc::now()));

    let fetched = env.services.links.get_link("DOCS-2026", None).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.original_url, created.original_url);
    assert_eq!(fetched.tags, created.tags);
    assert_eq!(fetched.created_at.timestamp(), created.created_at.timestamp());
}

#[tokio::test]
async fn test_generated_slug_is_lowercase_and_resolvable() {
    let env = setup().await;

    let link = env
        .services
        .links
        .create_link(create_request("https://example.com", None))
        .await
        .unwrap();

    assert_eq!(link.slug.len(), env.config.slug.default_length);
    assert!(
        link.slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    );
    assert!(env.services.links.get_link(&link.slug, None).await.is_ok());
}

#[tokio::test]
async fn test_duplicate_slug_conflicts_per_domain() {
    let env = setup().await;
    create_link(&env, "taken").await;

    let err = env
        .services
        .links
        .create_link(create_request("https://example.org", Some("taken")))
        .await
        .unwrap_err();
    assert!(matches!(err, TrelayError::SlugConflict(_)));
    assert_eq!(err.code(), "slug_taken");

    let other_domain = env
        .services
        .links
        .create_link(CreateLinkRequest {
            domain: Some("Go.Example.com".into()),
            ..create_request("https://example.org", Some("taken"))
        })
        .await
        .unwrap();
    assert_eq!(other_domain.domain.as_deref(), Some("go.example.com"));
}

#[tokio::test]
async fn test_create_validation_errors() {
    let env = setup().await;
    let links = &env.services.links;

    let err = links
        .create_link(create_request("javascript:alert(1)", None))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("url"));

    let err = links
        .create_link(create_request("https://example.com", Some("api")))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("slug"));

    let err = links
        .create_link(CreateLinkRequest {
            folder_id: Some(999),
            ..create_request("https://example.com", None)
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("folder_id"));

    let err = links
        .create_link(CreateLinkRequest {
            password: Some("x".repeat(129)),
            ..create_request("https://example.com", None)
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("password"));
}

#[tokio::test]
async fn test_update_partial_fields() {
    let env = setup().await;
    let links = &env.services.links;
    let folder = env
        .services
        .folders
        .create_folder(CreateFolderRequest {
            name: "Work".into(),
            parent_id: None,
        })
        .await
        .unwrap();

    links
        .create_link(CreateLinkRequest {
            password: Some("hunter2".into()),
            ttl_hours: Some(1),
            folder_id: Some(folder.id),
            ..create_request("https://example.com/a", Some("patchme"))
        })
        .await
        .unwrap();

    let updated = links
        .update_link(
            "patchme",
            None,
            UpdateLinkRequest {
                url: Some("https://example.com/b".into()),
                password: Some(String::new()),
                ttl_hours: Some(0),
                folder_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.original_url, "https://example.com/b");
    assert!(!updated.has_password);
    assert!(updated.expires_at.is_none());
    assert!(updated.folder_id.is_none());
    assert!(updated.updated_at >= updated.created_at);

    // 未提供的字段保持不变
    let unchanged = links
        .update_link(
            "patchme",
            None,
            UpdateLinkRequest {
                tags: Some(vec!["Later".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged.original_url, "https://example.com/b");
    assert_eq!(unchanged.tags, vec!["later"]);
}

#[tokio::test]
async fn test_list_filters_and_total() {
    let env = setup().await;
    let links = &env.services.links;

    for slug in ["alpha1", "alpha2", "beta01"] {
        create_link(&env, slug).await;
    }
    links
        .create_link(CreateLinkRequest {
            tags: Some(vec!["promo".into()]),
            ..create_request("https://shop.example.com", Some("promo1"))
        })
        .await
        .unwrap();
    links.delete_link("beta01", None, false).await.unwrap();

    let (items, total) = links.list_links(&LinkFilter::default()).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|l| l.slug != "beta01"));

    let (items, total) = links
        .list_links(&LinkFilter {
            only_deleted: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].slug, "beta01");
    assert!(items[0].deleted_at.is_some());

    let (items, _) = links
        .list_links(&LinkFilter {
            search: Some("alpha".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(items.len(), 2);

    let (items, _) = links
        .list_links(&LinkFilter {
            tags: vec!["promo".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].slug, "promo1");

    let (page, total) = links
        .list_links(&LinkFilter {
            include_deleted: true,
            limit: 2,
            offset: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn test_get_soft_deleted_is_not_found() {
    let env = setup().await;
    create_link(&env, "gone01").await;
    env.services
        .links
        .delete_link("gone01", None, false)
        .await
        .unwrap();

    let err = env.services.links.get_link("gone01", None).await.unwrap_err();
    assert!(matches!(err, TrelayError::NotFound(_)));
}

async fn create_tagged(env: &common::TestEnv, slug: &str, tags: &[&str]) {
    env.services
        .links
        .create_link(CreateLinkRequest {
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ..create_request("https://example.com/tagged", Some(slug))
        })
        .await
        .unwrap();
}

async fn slugs_matching(env: &common::TestEnv, filter: LinkFilter) -> Vec<String> {
    let (items, total) = env.services.links.list_links(&filter).await.unwrap();
    assert_eq!(total as usize, items.len());
    let mut slugs: Vec<String> = items.into_iter().map(|l| l.slug).collect();
    slugs.sort();
    slugs
}

#[tokio::test]
async fn test_tag_filter_is_literal() {
    let env = setup().await;
    create_tagged(&env, "tagged1", &["abc"]).await;
    create_tagged(&env, "tagged2", &["a_c"]).await;
    create_tagged(&env, "tagged3", &["100%"]).await;
    create_tagged(&env, "tagged4", &["say \"hi\""]).await;

    let by_tag = |tag: &str| LinkFilter {
        tags: vec![tag.to_string()],
        ..Default::default()
    };

    assert_eq!(slugs_matching(&env, by_tag("a_c")).await, vec!["tagged2"]);
    assert_eq!(slugs_matching(&env, by_tag("abc")).await, vec!["tagged1"]);
    assert_eq!(slugs_matching(&env, by_tag("100%")).await, vec!["tagged3"]);
    assert!(slugs_matching(&env, by_tag("%")).await.is_empty());
    assert_eq!(
        slugs_matching(&env, by_tag("say \"hi\"")).await,
        vec!["tagged4"]
    );
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let env = setup().await;
    create_link(&env, "plain1").await;
    create_link(&env, "my_link").await;
    create_link(&env, "myxlink").await;

    let search = |term: &str| LinkFilter {
        search: Some(term.to_string()),
        ..Default::default()
    };

    assert!(slugs_matching(&env, search("%")).await.is_empty());
    assert_eq!(slugs_matching(&env, search("_")).await, vec!["my_link"]);
    assert_eq!(slugs_matching(&env, search("y_l")).await, vec!["my_link"]);
    assert_eq!(
        slugs_matching(&env, search("link")).await,
        vec!["my_link", "myxlink"]
    );
}
