mod support;

use medee::application::catalog::PostFilter;
use medee::application::content::ContentError;
use medee::domain::error::DomainError;
use medee::domain::posts::{PostDraft, PostPatch};
use medee::infra::memory::KvOp;
use support::{Harness, post};

fn draft(slug: &str, title: &str) -> PostDraft {
    PostDraft {
        slug: slug.to_string(),
        title: title.to_string(),
        content: "body".to_string(),
        category: "Advent".to_string(),
        published: true,
        ..PostDraft::default()
    }
}

#[tokio::test]
async fn created_post_reads_back() {
    let harness = Harness::new();
    let created = harness
        .content
        .create_post(draft("first", "First"))
        .await
        .expect("create");

    assert!(harness.kv.raw("post:first").is_some());
    let fetched = harness.content.get_post("first").await.expect("get");
    assert_eq!(fetched, created);
    assert_eq!(
        harness.content.list_posts().await.expect("list"),
        vec!["first".to_string()]
    );
}

#[tokio::test]
async fn update_keeps_identity_and_creation_time() {
    let harness = Harness::new();
    let created = harness
        .content
        .create_post(draft("first", "First"))
        .await
        .expect("create");

    let updated = harness
        .content
        .update_post(
            "first",
            PostPatch {
                title: Some("Renamed title".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.title, "Renamed title");
    assert_eq!(updated.content, created.content);
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let harness = Harness::new();
    let err = harness.content.get_post("ghost").await.expect_err("missing");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn legacy_key_is_read_and_rewritten_on_update() {
    let harness = Harness::new();
    harness.seed("old-slug", &post("old-slug", "Advent"));

    let fetched = harness.content.get_post("old-slug").await.expect("legacy read");
    assert_eq!(fetched.slug, "old-slug");

    harness
        .content
        .update_post(
            "old-slug",
            PostPatch {
                excerpt: Some("fresh".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect("update");

    assert!(harness.kv.raw("post:old-slug").is_some());
    assert!(harness.kv.raw("old-slug").is_none());
}

#[tokio::test]
async fn delete_removes_every_key_shape() {
    let harness = Harness::new();
    harness.seed("post:gone", &post("gone", "Advent"));
    harness.seed("gone", &post("gone", "Advent"));

    harness.content.delete_post("gone").await.expect("delete");

    assert!(harness.kv.keys().is_empty());
    assert!(harness.content.get_post("gone").await.expect_err("gone").is_not_found());
}

#[tokio::test]
async fn rename_moves_the_post() {
    let harness = Harness::new();
    harness
        .content
        .create_post(draft("before", "Before"))
        .await
        .expect("create");

    let renamed = harness
        .content
        .update_post(
            "before",
            PostPatch {
                slug: Some("after".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect("rename");

    assert_eq!(renamed.slug, "after");
    assert_eq!(harness.kv.keys(), vec!["post:after".to_string()]);
}

#[tokio::test]
async fn failed_delete_during_rename_leaves_both_copies() {
    let harness = Harness::new();
    harness
        .content
        .create_post(draft("before", "Before"))
        .await
        .expect("create");
    harness.kv.fail_key(KvOp::Delete, "post:before");

    let err = harness
        .content
        .update_post(
            "before",
            PostPatch {
                slug: Some("after".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("delete failure surfaces");
    assert!(matches!(err, ContentError::Store(_)));

    // The new copy exists, so the post is never lost.
    assert!(harness.kv.raw("post:after").is_some());
    assert!(harness.kv.raw("post:before").is_some());
}

#[tokio::test]
async fn failed_write_during_rename_keeps_the_original() {
    let harness = Harness::new();
    harness
        .content
        .create_post(draft("before", "Before"))
        .await
        .expect("create");
    harness.kv.fail_key(KvOp::Put, "post:after");

    harness
        .content
        .update_post(
            "before",
            PostPatch {
                slug: Some("after".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("write failure surfaces");

    assert!(harness.kv.raw("post:before").is_some());
    assert!(harness.kv.raw("post:after").is_none());
}

#[tokio::test]
async fn aggregate_read_drops_unreadable_entries() {
    let harness = Harness::new();
    harness.seed("post:a", &post("a", "Advent"));
    harness.kv.insert_raw("post:broken", "not json");
    harness.seed("post:c", &post("c", "Advent"));
    harness.seed("post:d", &post("d", "Advent"));
    harness.kv.fail_key(KvOp::Get, "post:d");

    let posts = harness.content.get_all_posts().await.expect("aggregate");
    let slugs: Vec<&str> = posts.iter().map(|post| post.slug.as_str()).collect();
    assert_eq!(slugs, vec!["a", "c"]);
}

#[tokio::test]
async fn aggregate_read_fails_when_listing_fails() {
    let harness = Harness::new();
    harness.kv.fail_op(KvOp::List);
    assert!(harness.content.get_all_posts().await.is_err());
}

#[tokio::test]
async fn upsert_creates_missing_post() {
    let harness = Harness::new();
    let post = harness
        .content
        .upsert_post(
            "fresh",
            PostPatch {
                title: Some("Fresh".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect("upsert");

    assert_eq!(post.slug, "fresh");
    assert!(post.published);
    assert!(harness.kv.raw("post:fresh").is_some());
}

#[tokio::test]
async fn upsert_rejects_mismatched_body_slug_for_new_post() {
    let harness = Harness::new();
    let err = harness
        .content
        .upsert_post(
            "fresh",
            PostPatch {
                slug: Some("other".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("mismatch");
    assert!(matches!(err, ContentError::Domain(_)));
    assert!(harness.kv.keys().is_empty());
}

#[tokio::test]
async fn migration_moves_bare_keys_and_reports_conflicts() {
    let harness = Harness::new();
    harness.seed("legacy", &post("legacy", "Advent"));
    harness.seed("clash", &post("clash", "Advent"));
    harness.seed("post:clash", &post("clash", "Advent"));
    harness.kv.insert_raw("junk", "{not a post");

    let dry = harness
        .content
        .migrate_legacy_keys(true)
        .await
        .expect("dry run");
    assert_eq!(dry.moved.len(), 1);
    assert!(harness.kv.raw("legacy").is_some());

    let report = harness
        .content
        .migrate_legacy_keys(false)
        .await
        .expect("migrate");
    assert_eq!(
        report.moved,
        vec![("legacy".to_string(), "post:legacy".to_string())]
    );
    assert_eq!(report.conflicts, vec!["clash".to_string()]);
    assert_eq!(report.invalid, vec!["junk".to_string()]);
    assert!(!report.is_clean());

    assert!(harness.kv.raw("post:legacy").is_some());
    assert!(harness.kv.raw("legacy").is_none());
    assert!(harness.kv.raw("clash").is_some());
}

#[tokio::test]
async fn created_post_is_listed_and_filtered_by_category_and_published_flag() {
    let harness = Harness::new();
    harness
        .content
        .create_post(PostDraft {
            slug: "a".into(),
            title: "T".into(),
            category: "Сайн мэдээ".into(),
            published: true,
            ..PostDraft::default()
        })
        .await
        .expect("create");

    let slugs = harness.content.list_posts().await.expect("list");
    assert!(slugs.contains(&"a".to_string()));

    let fetched = harness.content.get_post("a").await.expect("get");
    assert!(fetched.published);

    let all = harness.content.get_all_posts().await.expect("all");
    let in_category = PostFilter::default().in_category(Some("Сайн мэдээ")).apply(&all);
    assert!(in_category.iter().any(|post| post.slug == "a"));

    let unpublished = PostFilter {
        published: Some(false),
        ..PostFilter::default()
    }
    .apply(&all);
    assert!(unpublished.iter().all(|post| post.slug != "a"));
}

#[tokio::test]
async fn slugs_shaped_like_canonical_keys_are_rejected() {
    let harness = Harness::new();
    harness
        .content
        .create_post(draft("b", "B"))
        .await
        .expect("create b");

    let err = harness
        .content
        .create_post(draft("post:b", "Shadow"))
        .await
        .expect_err("prefixed slug");
    assert!(matches!(err, ContentError::Domain(DomainError::Validation { .. })));

    let err = harness
        .content
        .update_post(
            "b",
            PostPatch {
                slug: Some("post:c".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("prefixed rename");
    assert!(matches!(err, ContentError::Domain(DomainError::Validation { .. })));
    assert_eq!(harness.kv.keys(), vec!["post:b".to_string()]);
}

#[tokio::test]
async fn renaming_prefixed_slug_onto_its_bare_form_keeps_the_post() {
    let harness = Harness::new();
    harness.seed("post:post:b", &post("post:b", "Advent"));

    let renamed = harness
        .content
        .update_post(
            "post:b",
            PostPatch {
                slug: Some("b".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect("rename");

    assert_eq!(renamed.slug, "b");
    assert_eq!(harness.kv.keys(), vec!["post:b".to_string()]);
    assert_eq!(harness.content.get_post("b").await.expect("moved").slug, "b");
}

#[tokio::test]
async fn deleting_prefixed_slug_leaves_other_posts_alone() {
    let harness = Harness::new();
    harness
        .content
        .create_post(draft("b", "B"))
        .await
        .expect("create b");

    harness.content.delete_post("post:b").await.expect("delete");

    assert_eq!(harness.kv.keys(), vec!["post:b".to_string()]);
    assert_eq!(harness.content.get_post("b").await.expect("survives").slug, "b");
}
