use pagelens_core::models::{BrokenLink, CrawlResult, CrawlStatus};
use pagelens_core::traits::ResultStore;
use pagelens_db::{ListParams, ListSort};
use uuid::Uuid;

use crate::integration::common::setup_test_db;

fn completed(url: &str, internal: u32) -> CrawlResult {
    let mut result = CrawlResult::queued(url);
    result.page_title = format!("Title of {url}");
    result.html_version = "HTML5".into();
    result.headings.insert("h1".into(), 1);
    result.headings.insert("h3".into(), 4);
    result.internal_links_count = internal;
    result.external_links_count = 2;
    result.set_broken_links(vec![BrokenLink {
        url: format!("{url}/gone"),
        status_code: 404,
    }]);
    result.has_login_form = true;
    result.mark_completed();
    result
}

#[tokio::test]
async fn create_assigns_id_and_get_returns_record() {
    let (db, _container) = setup_test_db().await;
    let repo = db.result_repo();

    let record = completed("https://example.com", 7);
    let id = repo.create(&record).await.unwrap();
    assert!(!id.is_nil());

    let stored = repo.get(id).await.unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.url, "https://example.com");
    assert_eq!(stored.status, CrawlStatus::Completed);
    assert_eq!(stored.headings, record.headings);
    assert_eq!(stored.internal_links_count, 7);
    assert_eq!(stored.inaccessible_links_count, 1);
    assert_eq!(stored.broken_links, record.broken_links);
    assert!(stored.has_login_form);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (db, _container) = setup_test_db().await;
    let repo = db.result_repo();

    let err = repo.get(Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());

    let mut ghost = CrawlResult::queued("https://ghost.example");
    ghost.id = Uuid::new_v4();
    assert!(repo.update(&ghost).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn update_replaces_previous_crawl() {
    let (db, _container) = setup_test_db().await;
    let repo = db.result_repo();
    let id = repo.create(&completed("https://example.com", 10)).await.unwrap();

    let mut record = repo.get(id).await.unwrap();
    record.mark_running();
    repo.update(&record).await.unwrap();

    let running = repo.get(id).await.unwrap();
    assert_eq!(running.status, CrawlStatus::Running);
    assert!(running.headings.is_empty());
    assert!(running.broken_links.is_empty());
    assert_eq!(running.internal_links_count, 0);

    record.internal_links_count = 3;
    record.mark_failed("Network error: connection refused");
    repo.update(&record).await.unwrap();

    let failed = repo.get(id).await.unwrap();
    assert_eq!(failed.status, CrawlStatus::Error);
    assert_eq!(failed.internal_links_count, 3);
    assert_eq!(failed.error_message, "Network error: connection refused");
    assert!(failed.updated_at >= failed.created_at);
}

#[tokio::test]
async fn list_filters_sorts_and_pages() {
    let (db, _container) = setup_test_db().await;
    let repo = db.result_repo();
    for (url, internal) in [
        ("https://alpha.example", 5),
        ("https://beta.example", 1),
        ("https://gamma.test", 9),
        ("https://ALPHA.example/docs", 3),
    ] {
        repo.create(&completed(url, internal)).await.unwrap();
    }

    let params = ListParams {
        sort: "-internal_links_count".parse::<ListSort>().unwrap(),
        ..ListParams::default()
    };
    let all = repo.list(&params).await.unwrap();
    let counts: Vec<u32> = all.iter().map(|r| r.internal_links_count).collect();
    assert_eq!(counts, vec![9, 5, 3, 1]);

    let params = ListParams {
        filter: Some("alpha".into()),
        sort: "url".parse().unwrap(),
        ..ListParams::default()
    };
    let alpha = repo.list(&params).await.unwrap();
    assert_eq!(alpha.len(), 2, "filter is a case-insensitive substring match");

    let params = ListParams {
        limit: 2,
        offset: 2,
        sort: "internal_links_count".parse().unwrap(),
        filter: None,
    };
    let page: Vec<u32> = repo
        .list(&params)
        .await
        .unwrap()
        .iter()
        .map(|r| r.internal_links_count)
        .collect();
    assert_eq!(page, vec![5, 9]);

    let params = ListParams {
        filter: Some("%".into()),
        ..ListParams::default()
    };
    assert!(repo.list(&params).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_many_reports_rows_removed() {
    let (db, _container) = setup_test_db().await;
    let repo = db.result_repo();
    let keep = repo.create(&completed("https://keep.example", 1)).await.unwrap();
    let a = repo.create(&completed("https://a.example", 1)).await.unwrap();
    let b = repo.create(&completed("https://b.example", 1)).await.unwrap();

    let deleted = repo.delete_many(&[a, b, Uuid::new_v4()]).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(repo.delete_many(&[]).await.unwrap(), 0);

    assert!(repo.get(a).await.unwrap_err().is_not_found());
    assert_eq!(repo.get(keep).await.unwrap().id, keep);
}

#[tokio::test]
async fn repository_works_through_store_trait() {
    let (db, _container) = setup_test_db().await;
    let store = db.result_repo();
    store.health_check().await.unwrap();

    async fn round_trip<S: ResultStore>(store: &S) -> CrawlResult {
        let id = store
            .create(&CrawlResult::queued("https://trait.example"))
            .await
            .unwrap();
        store.get(id).await.unwrap()
    }

    let record = round_trip(&store).await;
    assert_eq!(record.status, CrawlStatus::Queued);
    assert!(record.page_title.is_empty());
}
