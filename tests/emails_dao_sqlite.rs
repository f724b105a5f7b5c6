use case_views::emails::{ChangeEvent, DomainEvent, EmailEvent, EmailSearchParams, ModuleDataEvent};
use case_views::models::TreeCount;
use case_views::store::{ARTIFACT_TYPE_EMAIL_MSG, CellValue};
use case_views::test_support::{ATTRIBUTE_TYPE_SUBJECT, TestCaseDatabase};

const BOB: &str = "bob@example.com";

async fn seeded_case() -> TestCaseDatabase {
    let case = TestCaseDatabase::new().await.expect("sqlite case database");
    case.insert_email(1, 1, Some("/img/bob@example.com/Inbox/1"))
        .await
        .expect("insert");
    case.insert_email(2, 1, Some("/img/bob@example.com/Inbox/2"))
        .await
        .expect("insert");
    case.insert_email(3, 1, Some("/img/bob@example.com/Sent/3"))
        .await
        .expect("insert");
    case.insert_email(4, 2, Some("/img/alice/Inbox/4"))
        .await
        .expect("insert");
    case.insert_email(5, 1, Some("/img/orphan"))
        .await
        .expect("insert");
    case.insert_attribute(1, ATTRIBUTE_TYPE_SUBJECT, "hello")
        .await
        .expect("insert");
    case
}

fn folder(ds: Option<i64>, account: &str, folder: &str) -> EmailSearchParams {
    EmailSearchParams::new(ds, Some(account.to_string()), Some(folder.to_string()))
}

fn ids(page: &case_views::models::ResultPage) -> Vec<i64> {
    page.rows.iter().map(|row| row.artifact_id).collect()
}

#[tokio::test]
async fn empty_folder_returns_empty_page() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let page = dao
        .fetch_page(folder(Some(1), "bob", "inbox"), 0, Some(50))
        .await
        .expect("page");

    assert!(page.rows.is_empty());
    assert_eq!(page.total_results, 0);
}

#[tokio::test]
async fn folder_page_lists_messages_with_attributes() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let page = dao
        .fetch_page(folder(Some(1), BOB, "Inbox"), 0, Some(50))
        .await
        .expect("page");

    assert_eq!(ids(&page), vec![1, 2]);
    assert_eq!(page.column_keys, vec!["TSK_PATH", "TSK_SUBJECT"]);
    assert_eq!(
        page.rows[0].cells,
        vec![
            CellValue::Text("/img/bob@example.com/Inbox/1".to_string()),
            CellValue::Text("hello".to_string()),
        ]
    );
    assert_eq!(page.rows[1].cells[1], CellValue::Null);
    assert_eq!(page.rows[0].data_source_id, 1);
}

#[tokio::test]
async fn pages_apply_offset_and_limit() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let second = dao
        .fetch_page(folder(Some(1), BOB, "Inbox"), 1, Some(1))
        .await
        .expect("page");
    assert_eq!(ids(&second), vec![2]);
    assert_eq!(second.start_item, 1);

    let unbounded = dao
        .fetch_page(folder(Some(1), BOB, "Inbox"), 0, None)
        .await
        .expect("page");
    assert_eq!(ids(&unbounded), vec![1, 2]);
}

#[tokio::test]
async fn data_source_filter_is_optional() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let any_source = dao
        .fetch_page(folder(None, "alice", "Inbox"), 0, Some(50))
        .await
        .expect("page");
    assert_eq!(ids(&any_source), vec![4]);

    let other_source = dao
        .fetch_page(folder(Some(1), "alice", "Inbox"), 0, Some(50))
        .await
        .expect("page");
    assert!(other_source.rows.is_empty());
}

#[tokio::test]
async fn unset_account_and_folder_list_unresolved_paths() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let page = dao
        .fetch_page(EmailSearchParams::new(None, None, None), 0, Some(50))
        .await
        .expect("page");
    assert_eq!(ids(&page), vec![5]);
}

#[tokio::test]
async fn account_counts_skip_paths_that_do_not_decode() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let items = dao.fetch_group_counts(None, None).await.expect("counts");
    let summary: Vec<_> = items
        .iter()
        .map(|item| (item.display_name.as_str(), item.count))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("alice", TreeCount::Determinate(1)),
            (BOB, TreeCount::Determinate(3)),
        ]
    );
}

#[tokio::test]
async fn account_must_be_the_third_segment() {
    let case = TestCaseDatabase::new().await.expect("sqlite case database");
    case.insert_email(1, 1, Some("/img/bob/Inbox/1"))
        .await
        .expect("insert");
    case.insert_email(2, 1, Some("/img/alice/bob/2"))
        .await
        .expect("insert");
    case.insert_email(3, 1, Some("/img/x/bob/Inbox/3"))
        .await
        .expect("insert");
    let dao = case.emails_dao();

    let items = dao.fetch_group_counts(None, Some("bob")).await.expect("counts");
    let summary: Vec<_> = items
        .iter()
        .map(|item| (item.id.as_str(), item.count))
        .collect();
    assert_eq!(summary, vec![("bob/Inbox", TreeCount::Determinate(1))]);

    let page = dao
        .fetch_page(folder(None, "bob", "Inbox"), 0, None)
        .await
        .expect("page");
    assert_eq!(ids(&page), vec![1]);
}

#[tokio::test]
async fn accounts_differing_in_case_are_separate_groups() {
    let case = TestCaseDatabase::new().await.expect("sqlite case database");
    case.insert_email(1, 1, Some("/img/bob/Inbox/1"))
        .await
        .expect("insert");
    case.insert_email(2, 1, Some("/img/BOB/Inbox/2"))
        .await
        .expect("insert");
    let dao = case.emails_dao();

    let page = dao
        .fetch_page(folder(Some(1), "bob", "Inbox"), 0, Some(50))
        .await
        .expect("page");
    assert_eq!(ids(&page), vec![1]);

    let items = dao.fetch_group_counts(Some(1), Some("bob")).await.expect("counts");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].count, TreeCount::Determinate(1));

    let accounts = dao.fetch_group_counts(Some(1), None).await.expect("counts");
    let mut names: Vec<_> = accounts
        .iter()
        .map(|item| (item.display_name.as_str(), item.count))
        .collect();
    names.sort_by_key(|(name, _)| *name);
    assert_eq!(
        names,
        vec![
            ("BOB", TreeCount::Determinate(1)),
            ("bob", TreeCount::Determinate(1)),
        ]
    );
}

#[tokio::test]
async fn every_folder_node_can_be_paged() {
    let case = TestCaseDatabase::new().await.expect("sqlite case database");
    case.insert_email(1, 1, Some("/img/bob//1"))
        .await
        .expect("insert");
    case.insert_email(2, 1, Some("/img/bob/Inbox/2"))
        .await
        .expect("insert");
    let dao = case.emails_dao();

    let items = dao.fetch_group_counts(Some(1), Some("bob")).await.expect("counts");
    let names: Vec<_> = items.iter().map(|item| item.display_name.as_str()).collect();
    assert_eq!(names, vec!["Default", "Inbox"]);

    let mut pages = Vec::new();
    for item in &items {
        let page = dao
            .fetch_page(item.search_params.clone(), 0, Some(50))
            .await
            .expect("tree node pages");
        pages.push(ids(&page));
    }
    assert_eq!(pages, vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn folder_counts_for_one_account() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let items = dao.fetch_group_counts(Some(1), Some(BOB)).await.expect("counts");
    let summary: Vec<_> = items
        .iter()
        .map(|item| (item.id.as_str(), item.count))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("bob@example.com/Inbox", TreeCount::Determinate(2)),
            ("bob@example.com/Sent", TreeCount::Determinate(1)),
        ]
    );
}

#[tokio::test]
async fn ingest_changes_flow_through_pages_and_counts() {
    let case = seeded_case().await;
    let dao = case.emails_dao();

    let before = dao
        .fetch_page(folder(Some(1), BOB, "Inbox"), 0, Some(50))
        .await
        .expect("page");
    assert_eq!(ids(&before), vec![1, 2]);

    let added = case
        .insert_email(6, 1, Some("/img/bob@example.com/Inbox/6"))
        .await
        .expect("insert");
    let events = dao
        .handle_change(ChangeEvent::DataAdded(ModuleDataEvent {
            artifact_type_id: Some(ARTIFACT_TYPE_EMAIL_MSG),
            artifacts: vec![added],
        }))
        .await
        .expect("events");

    let changed = EmailEvent::new(1, Some(BOB.to_string()), Some("Inbox".to_string()));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], DomainEvent::GroupChanged(changed.clone()));
    assert!(folder(Some(1), BOB, "Inbox").is_refresh_required(&events[0]));

    let after = dao
        .fetch_page(folder(Some(1), BOB, "Inbox"), 0, Some(50))
        .await
        .expect("page");
    assert_eq!(ids(&after), vec![1, 2, 6]);

    let items = dao.fetch_group_counts(Some(1), Some(BOB)).await.expect("counts");
    assert_eq!(items[0].count, TreeCount::Indeterminate);
    assert_eq!(items[1].count, TreeCount::Determinate(1));

    let refreshed = dao
        .handle_change(ChangeEvent::IngestComplete)
        .await
        .expect("events");
    assert_eq!(refreshed.len(), 1);

    let items = dao.fetch_group_counts(Some(1), Some(BOB)).await.expect("counts");
    assert_eq!(items[0].count, TreeCount::Determinate(3));
}
