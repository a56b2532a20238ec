//! End-to-end tests of the export engine: fetch loop semantics, packaging,
//! and delivery-side descriptor resolution.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use batch_export::adapters::douyin::{DouyinProcessor, ExportCondition};
use batch_export::task::{TaskContext, TaskProcessor, TaskState, run_task};
use batch_export::{
    DeliveryClient, DeliveryConfig, Error, FailurePolicy, FetchError, FileInfo, FilePayload,
    ItemId, RetryConfig, TaskStatus,
};

use common::{Outcome, ScriptedFetcher, gallery_post, row_count, video_post, worksheet_xml};

fn ids(raw: &[&str]) -> Vec<ItemId> {
    raw.iter().map(|s| ItemId::from(*s)).collect()
}

fn fast_ctx() -> TaskContext {
    TaskContext::new(RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    })
}

fn spreadsheet_bytes(infos: &[FileInfo]) -> &[u8] {
    match &infos[0].payload {
        FilePayload::Buffer(bytes) => bytes,
        other => panic!("first descriptor must be the spreadsheet buffer, got {other:?}"),
    }
}

#[tokio::test]
async fn all_fetches_succeeding_fills_counters_and_rows() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("a", Outcome::Success(Box::new(video_post("a")))),
        ("b", Outcome::Success(Box::new(video_post("b")))),
        ("c", Outcome::Success(Box::new(video_post("c")))),
        ("d", Outcome::Success(Box::new(video_post("d")))),
    ]));
    let processor = DouyinProcessor::new(fetcher);
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["a", "b", "c", "d"]),
        need_media: false,
    });

    let infos = run_task(&processor, &mut task, &fast_ctx()).await.unwrap();

    assert_eq!(task.status(), TaskStatus::Complete);
    assert_eq!(task.completed(), 4);
    assert_eq!(task.total(), 4);
    assert_eq!(task.data().len(), 4);

    let sheet = worksheet_xml(spreadsheet_bytes(&infos));
    assert_eq!(row_count(&sheet), 5, "header plus four data rows");
}

#[tokio::test]
async fn one_permanent_failure_under_skip_leaves_a_gap() {
    // Input a, b, c; b fails permanently
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("a", Outcome::Success(Box::new(video_post("a")))),
        ("b", Outcome::PermanentFailure),
        ("c", Outcome::Success(Box::new(video_post("c")))),
    ]));
    let processor = DouyinProcessor::new(fetcher);
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["a", "b", "c"]),
        need_media: false,
    });

    let infos = run_task(&processor, &mut task, &fast_ctx()).await.unwrap();

    assert_eq!(task.completed(), 3, "skip still advances progress");
    assert_eq!(task.data().len(), 2);
    assert!(task.get(&ItemId::from("b")).is_none());

    let sheet = worksheet_xml(spreadsheet_bytes(&infos));
    assert_eq!(row_count(&sheet), 3, "header plus two data rows");

    // Remaining rows keep original relative order: a before c, no b row
    let pos_a = sheet.find("caption a").expect("row for a present");
    let pos_c = sheet.find("caption c").expect("row for c present");
    assert!(pos_a < pos_c, "a's row must precede c's row");
    assert!(!sheet.contains("caption b"), "no row for the failed id");
}

#[tokio::test]
async fn abort_policy_surfaces_the_error_and_fails_the_task() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("a", Outcome::Success(Box::new(video_post("a")))),
        ("b", Outcome::PermanentFailure),
        ("c", Outcome::Success(Box::new(video_post("c")))),
    ]));
    let processor =
        DouyinProcessor::new(fetcher.clone()).with_failure_policy(FailurePolicy::Abort);
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["a", "b", "c"]),
        need_media: false,
    });

    let result = run_task(&processor, &mut task, &fast_ctx()).await;

    assert!(matches!(
        result,
        Err(Error::Fetch(FetchError::NotFound { .. }))
    ));
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(task.completed(), 1, "prior progress is retained");
    assert_eq!(
        fetcher.total_calls(),
        2,
        "c is never fetched after the abort"
    );
}

#[tokio::test]
async fn transient_failures_are_retried_and_committed() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "a",
        Outcome::TransientFailures(2, Box::new(video_post("a"))),
    )]));
    let processor = DouyinProcessor::new(fetcher.clone());
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["a"]),
        need_media: false,
    });

    run_task(&processor, &mut task, &fast_ctx()).await.unwrap();

    assert_eq!(task.status(), TaskStatus::Complete);
    assert_eq!(task.data().len(), 1);
    assert_eq!(fetcher.total_calls(), 3, "two transient failures then success");
}

#[tokio::test]
async fn cancellation_after_k_commits_stops_promptly() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("a", Outcome::Success(Box::new(video_post("a")))),
        ("b", Outcome::Success(Box::new(video_post("b")))),
        ("c", Outcome::Success(Box::new(video_post("c")))),
        ("d", Outcome::Success(Box::new(video_post("d")))),
    ]));
    let processor = DouyinProcessor::new(fetcher.clone());
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["a", "b", "c", "d"]),
        need_media: false,
    });

    let cancel = CancellationToken::new();
    let ctx = fast_ctx().with_cancel(cancel.clone());

    // Cancel once two items have been committed
    let mut events = task.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let batch_export::TaskEvent::Progress { completed: 2, .. } = event {
                cancel.cancel();
                break;
            }
        }
    });

    processor.execute(&mut task, &ctx).await.unwrap();

    assert_eq!(task.status(), TaskStatus::Cancelled);
    assert!(
        task.completed() >= 2 && task.completed() < 4,
        "no full run after cancellation, completed {}",
        task.completed()
    );

    // A cancelled task still exports what it has
    let infos = processor.file_infos(&task).unwrap();
    let sheet = worksheet_xml(spreadsheet_bytes(&infos));
    assert_eq!(row_count(&sheet), task.data().len() + 1);
}

#[tokio::test]
async fn file_infos_is_idempotent_modulo_the_filename_timestamp() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("a", Outcome::Success(Box::new(video_post("a")))),
        ("g", Outcome::Success(Box::new(gallery_post("g", 3)))),
    ]));
    let processor = DouyinProcessor::new(fetcher);
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["a", "g"]),
        need_media: true,
    });

    processor
        .execute(&mut task, &fast_ctx())
        .await
        .unwrap();

    let first = processor.file_infos(&task).unwrap();
    let second = processor.file_infos(&task).unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(
        spreadsheet_bytes(&first),
        spreadsheet_bytes(&second),
        "workbook bytes are a pure function of the data"
    );
    // Media descriptors are element-wise identical
    assert_eq!(&first[1..], &second[1..]);
}

#[tokio::test]
async fn gallery_media_bundles_pick_the_last_variant() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "g",
        Outcome::Success(Box::new(gallery_post("g", 3))),
    )]));
    let processor = DouyinProcessor::new(fetcher);
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["g"]),
        need_media: true,
    });

    let infos = run_task(&processor, &mut task, &fast_ctx()).await.unwrap();

    assert_eq!(infos.len(), 2);
    let FilePayload::Zip(entries) = &infos[1].payload else {
        panic!("gallery media must be zip-typed");
    };
    assert_eq!(entries.len(), 3);
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry.filename, format!("{}.png", index + 1));
        let FilePayload::Url(url) = &entry.payload else {
            panic!("bundle entries must be url-typed");
        };
        assert_eq!(
            url,
            &format!("https://img.example.com/g/{}-high", index + 1),
            "each entry points at the last variant of its image"
        );
    }
}

#[tokio::test]
async fn delivery_resolves_url_bundles_by_downloading_each_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"one".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/2.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"two".to_vec()))
        .mount(&server)
        .await;

    let bundle = FileInfo::zip(
        "gallery.zip",
        vec![
            FileInfo::url("1.png", format!("{}/img/1.png", server.uri())),
            FileInfo::url("2.png", format!("{}/img/2.png", server.uri())),
        ],
    )
    .unwrap();

    let client = DeliveryClient::new(&DeliveryConfig::default(), RetryConfig::default()).unwrap();
    let deliverable = client
        .resolve(&bundle, &CancellationToken::new())
        .await
        .unwrap()
        .expect("not cancelled");

    assert_eq!(deliverable.filename, "gallery.zip");
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(deliverable.bytes)).expect("bundle is a zip");
    assert_eq!(archive.len(), 2);
    let mut content = Vec::new();
    std::io::Read::read_to_end(
        &mut archive.by_name("2.png").expect("entry present"),
        &mut content,
    )
    .unwrap();
    assert_eq!(content, b"two");
}

#[tokio::test]
async fn delivery_retries_server_errors_before_succeeding() {
    let server = MockServer::start().await;
    // First attempt is a 503, subsequent attempts succeed
    Mock::given(method("GET"))
        .and(path("/clip.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
        .mount(&server)
        .await;

    let retry = RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    let client = DeliveryClient::new(&DeliveryConfig::default(), retry).unwrap();
    let info = FileInfo::url("clip.mp4", format!("{}/clip.mp4", server.uri()));

    let deliverable = client
        .resolve(&info, &CancellationToken::new())
        .await
        .unwrap()
        .expect("not cancelled");
    assert_eq!(deliverable.bytes, b"video");
}

#[tokio::test]
async fn delivery_surfaces_permanent_download_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = DeliveryClient::new(&DeliveryConfig::default(), RetryConfig::default()).unwrap();
    let info = FileInfo::url("gone.png", format!("{}/gone.png", server.uri()));

    let result = client.resolve(&info, &CancellationToken::new()).await;
    assert!(matches!(
        result,
        Err(Error::Fetch(FetchError::Status { code: 404 }))
    ));
}

#[tokio::test]
async fn resolve_all_materializes_a_whole_export_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
        .mount(&server)
        .await;

    let infos = vec![
        FileInfo::buffer("report.xlsx", vec![1u8, 2, 3]),
        FileInfo::url("clip.mp4", format!("{}/clip.mp4", server.uri())),
    ];

    let client = DeliveryClient::new(&DeliveryConfig::default(), RetryConfig::default()).unwrap();
    let deliverables = client
        .resolve_all(&infos, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(deliverables.len(), 2);
    assert_eq!(deliverables[0].filename, "report.xlsx");
    assert_eq!(deliverables[1].filename, "clip.mp4");
    assert_eq!(deliverables[1].bytes, b"video");
}

/// Spec scenario: ids A, B, C with B failing permanently, no media
#[tokio::test]
async fn scenario_abc_with_b_failing() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("A", Outcome::Success(Box::new(video_post("A")))),
        ("B", Outcome::PermanentFailure),
        ("C", Outcome::Success(Box::new(video_post("C")))),
    ]));
    let processor = DouyinProcessor::new(fetcher);
    let mut task = TaskState::new(ExportCondition {
        post_ids: ids(&["A", "B", "C"]),
        need_media: false,
    });

    let infos = run_task(&processor, &mut task, &fast_ctx()).await.unwrap();

    assert_eq!(task.completed(), 3);
    assert_eq!(task.data().len(), 2);
    assert!(task.get(&ItemId::from("A")).is_some());
    assert!(task.get(&ItemId::from("C")).is_some());

    assert_eq!(infos.len(), 1, "no media requested");
    let sheet = worksheet_xml(spreadsheet_bytes(&infos));
    assert_eq!(row_count(&sheet), 3, "header plus rows for A and C");
    let pos_a = sheet.find("caption A").expect("A row present");
    let pos_c = sheet.find("caption C").expect("C row present");
    assert!(pos_a < pos_c);
}
