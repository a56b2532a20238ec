//! Shared helpers for integration tests.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use batch_export::adapters::douyin::{
    AuthorProfile, ImageSet, PostDetail, PostFetcher, PostKind, PostStatistics, VideoSource,
};
use batch_export::{FetchError, ItemId};

/// Per-id outcome scripted into a [`ScriptedFetcher`]
pub enum Outcome {
    /// Return the detail immediately
    Success(Box<PostDetail>),
    /// Fail permanently on every attempt
    PermanentFailure,
    /// Fail with a retryable error this many times, then succeed
    TransientFailures(u32, Box<PostDetail>),
}

/// Fetcher driven by a per-id outcome script, counting every attempt
pub struct ScriptedFetcher {
    outcomes: HashMap<String, Outcome>,
    attempts: Mutex<HashMap<String, u32>>,
    total_calls: AtomicU32,
}

impl ScriptedFetcher {
    pub fn new(outcomes: Vec<(&str, Outcome)>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|(id, outcome)| (id.to_string(), outcome))
                .collect(),
            attempts: Mutex::new(HashMap::new()),
            total_calls: AtomicU32::new(0),
        }
    }

    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostFetcher for ScriptedFetcher {
    async fn fetch_post(&self, id: &ItemId) -> Result<PostDetail, FetchError> {
        // Simulate a network suspension point so concurrent observers
        // (event subscribers, cancellation) get a chance to run
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(id.as_str().to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        match self.outcomes.get(id.as_str()) {
            Some(Outcome::Success(detail)) => Ok((**detail).clone()),
            Some(Outcome::PermanentFailure) | None => Err(FetchError::NotFound {
                id: id.as_str().to_string(),
            }),
            Some(Outcome::TransientFailures(failures, detail)) => {
                if attempt <= *failures {
                    Err(FetchError::RateLimited)
                } else {
                    Ok((**detail).clone())
                }
            }
        }
    }
}

/// A plain video post with deterministic fields derived from the id
pub fn video_post(id: &str) -> PostDetail {
    PostDetail {
        post_id: id.to_string(),
        share_url: format!("https://www.douyin.com/video/{id}"),
        kind: PostKind::Video,
        caption: format!("caption {id}"),
        statistics: PostStatistics {
            likes: 10,
            favorites: 2,
            comments: 3,
            shares: 1,
        },
        published_at: Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
        author: AuthorProfile {
            user_id: format!("u-{id}"),
            handle: format!("handle-{id}"),
            nickname: format!("nick-{id}"),
            sec_uid: format!("sec-{id}"),
            follower_count: 1000,
            bio: "bio".to_string(),
        },
        images: Vec::new(),
        video: Some(VideoSource {
            video_id: format!("v-{id}"),
        }),
    }
}

/// A gallery post whose images each carry variants ordered low-to-high
pub fn gallery_post(id: &str, image_count: usize) -> PostDetail {
    let mut post = video_post(id);
    post.kind = PostKind::Gallery;
    post.video = None;
    post.images = (1..=image_count)
        .map(|n| ImageSet {
            variant_urls: vec![
                format!("https://img.example.com/{id}/{n}-low"),
                format!("https://img.example.com/{id}/{n}-high"),
            ],
        })
        .collect();
    post
}

/// Extract the worksheet XML from packed workbook bytes
pub fn worksheet_xml(workbook: &[u8]) -> String {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(workbook.to_vec())).expect("workbook is a zip");
    let mut sheet = archive
        .by_name("xl/worksheets/sheet1.xml")
        .expect("worksheet part present");
    let mut content = String::new();
    sheet
        .read_to_string(&mut content)
        .expect("worksheet is valid UTF-8");
    content
}

/// Number of `<row>` elements in a worksheet, header included
pub fn row_count(worksheet: &str) -> usize {
    worksheet.matches("<row r=").count()
}
