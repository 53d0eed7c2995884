use issue_indexer::db;
use issue_indexer::error::PipelineError;
use issue_indexer::migrate;
use issue_indexer::models::IssueRecord;
use issue_indexer::store::{fingerprint, fingerprint_store, IssueStore, SqliteIssueStore};
use sqlx::Row;
use tempfile::TempDir;

fn issue(id: i64, state: &str) -> IssueRecord {
    IssueRecord {
        id,
        title: format!("Title {}", id),
        description: if id % 2 == 0 {
            String::new()
        } else {
            format!("Description with 'quotes' and unicode é {}", id)
        },
        state: state.to_string(),
        created_at: "2023-11-05T14:22:10.123Z".to_string(),
        updated_at: "2023-11-06T08:00:00.000Z".to_string(),
        author: "Barbara Liskov".to_string(),
        labels: if id % 3 == 0 {
            vec![]
        } else {
            vec!["ui".to_string(), "needs triage".to_string()]
        },
    }
}

async fn open_store(tmp: &TempDir) -> SqliteIssueStore {
    let pool = db::connect_path(&tmp.path().join("data/issues.sqlite"))
        .await
        .unwrap();
    SqliteIssueStore::new(pool)
}

#[tokio::test]
async fn test_replace_then_page_back() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    // ids out of numeric order: pages follow insertion order
    let records = vec![
        issue(30, "opened"),
        issue(10, "closed"),
        issue(20, "opened"),
        issue(5, "opened"),
        issue(7, "closed"),
    ];
    store.replace_all(&records).await.unwrap();

    let mut read_back = Vec::new();
    let mut offset = 0;
    loop {
        let page = store.read_page(offset, 2).await.unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 2);
        read_back.extend(page);
        offset += 2;
    }
    assert_eq!(read_back, records);
    assert_eq!(store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_offset_past_end_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    store.replace_all(&[issue(1, "opened")]).await.unwrap();

    assert!(store.read_page(1, 10).await.unwrap().is_empty());
    assert!(store.read_page(1000, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replace_drops_previous_contents() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .replace_all(&[issue(1, "opened"), issue(2, "opened"), issue(3, "closed")])
        .await
        .unwrap();
    store.replace_all(&[issue(4, "closed")]).await.unwrap();

    let all = store.read_page(0, 100).await.unwrap();
    assert_eq!(all, vec![issue(4, "closed")]);
}

#[tokio::test]
async fn test_replace_with_empty_set_clears_table() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store.replace_all(&[issue(1, "opened")]).await.unwrap();
    store.replace_all(&[]).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.read_page(0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_content_column_is_derived() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let records = vec![issue(1, "opened"), issue(2, "opened")];
    store.replace_all(&records).await.unwrap();

    let rows = sqlx::query("SELECT content, labels FROM gitlab_issues ORDER BY rowid")
        .fetch_all(store.pool())
        .await
        .unwrap();
    let content: Vec<String> = rows.iter().map(|r| r.get("content")).collect();
    assert_eq!(content, vec![records[0].content(), records[1].content()]);
    assert_eq!(content[1], "Title 2. ");
    let labels: String = rows[0].get("labels");
    assert_eq!(labels, "ui,needs triage");
}

#[tokio::test]
async fn test_state_breakdown() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    store
        .replace_all(&[
            issue(1, "opened"),
            issue(2, "closed"),
            issue(3, "opened"),
        ])
        .await
        .unwrap();

    assert_eq!(
        store.count_by_state().await.unwrap(),
        vec![("opened".to_string(), 2), ("closed".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_fingerprint_survives_storage() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let records: Vec<IssueRecord> = (1..=7).map(|i| issue(i, "opened")).collect();
    store.replace_all(&records).await.unwrap();

    let (count, digest) = fingerprint_store(&store, 3).await.unwrap();
    assert_eq!(count, 7);
    assert_eq!(digest, fingerprint(&records));
}

#[tokio::test]
async fn test_init_is_idempotent_and_keeps_rows() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    migrate::create_staging_table(store.pool()).await.unwrap();
    store.replace_all(&[issue(1, "opened")]).await.unwrap();
    migrate::create_staging_table(store.pool()).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_table_is_store_error() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let err = store.read_page(0, 10).await.unwrap_err();
    assert!(matches!(err, PipelineError::StoreIo(_)));
}

#[tokio::test]
async fn test_huge_offset_and_limit_do_not_wrap() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let records = vec![issue(1, "opened"), issue(2, "closed"), issue(3, "opened")];
    store.replace_all(&records).await.unwrap();

    assert_eq!(store.read_page(0, usize::MAX).await.unwrap(), records);
    assert!(store.read_page(usize::MAX, usize::MAX).await.unwrap().is_empty());
    assert!(store.read_page(usize::MAX, 10).await.unwrap().is_empty());

    let (count, digest) = fingerprint_store(&store, usize::MAX).await.unwrap();
    assert_eq!(count, 3);
    assert_eq!(digest, fingerprint(&records));
}
