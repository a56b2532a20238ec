//! Progress observation: subscribe to task events while the fetch loop runs.
//!
//! Run with: cargo run --example progress_events

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batch_export::adapters::douyin::{
    AuthorProfile, DouyinProcessor, ExportCondition, PostDetail, PostFetcher, PostKind,
    PostStatistics, VideoSource,
};
use batch_export::task::{TaskContext, TaskProcessor, TaskState};
use batch_export::{FetchError, ItemId, TaskEvent};

struct SlowFetcher;

#[async_trait]
impl PostFetcher for SlowFetcher {
    async fn fetch_post(&self, id: &ItemId) -> Result<PostDetail, FetchError> {
        // Pretend the platform takes a moment per item
        tokio::time::sleep(Duration::from_millis(200)).await;
        if id.as_str() == "missing" {
            return Err(FetchError::NotFound {
                id: id.as_str().to_string(),
            });
        }
        Ok(PostDetail {
            post_id: id.as_str().to_string(),
            share_url: format!("https://www.douyin.com/video/{id}"),
            kind: PostKind::Video,
            caption: format!("post {id}"),
            statistics: PostStatistics::default(),
            published_at: chrono::Utc::now(),
            author: AuthorProfile {
                user_id: "10001".to_string(),
                handle: "demo_creator".to_string(),
                nickname: "Demo Creator".to_string(),
                sec_uid: "MS4wLjABAAAAdemo".to_string(),
                follower_count: 99_000,
                bio: String::new(),
            },
            images: Vec::new(),
            video: Some(VideoSource {
                video_id: format!("v0200f{id}"),
            }),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let processor = DouyinProcessor::new(Arc::new(SlowFetcher));
    let mut task = TaskState::new(ExportCondition {
        post_ids: vec!["1".into(), "missing".into(), "2".into(), "3".into()],
        need_media: false,
    });

    // Progress subscriber, e.g. a UI
    let mut events = task.subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TaskEvent::TotalSet { total } => println!("starting: {total} item(s)"),
                TaskEvent::Progress { completed, total } => {
                    println!("progress: {completed}/{total}");
                }
                TaskEvent::ItemSkipped { id, error } => println!("skipped {id}: {error}"),
                TaskEvent::DataCommitted { entries } => println!("stored: {entries} result(s)"),
                TaskEvent::StatusChanged { status } => println!("status: {status:?}"),
            }
        }
    });

    processor.execute(&mut task, &TaskContext::default()).await?;
    drop(task); // closes the event channel, ending the observer
    observer.await?;

    Ok(())
}
