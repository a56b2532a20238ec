//! Basic export: fetch two posts through an in-memory fetcher and print the
//! resulting artifacts.
//!
//! Run with: cargo run --example basic_export

use std::sync::Arc;

use async_trait::async_trait;
use batch_export::adapters::douyin::{
    AuthorProfile, DouyinProcessor, ExportCondition, PostDetail, PostFetcher, PostKind,
    PostStatistics, VideoSource,
};
use batch_export::task::{TaskContext, TaskState, run_task};
use batch_export::{FetchError, FilePayload, ItemId};

struct DemoFetcher;

#[async_trait]
impl PostFetcher for DemoFetcher {
    async fn fetch_post(&self, id: &ItemId) -> Result<PostDetail, FetchError> {
        Ok(PostDetail {
            post_id: id.as_str().to_string(),
            share_url: format!("https://www.douyin.com/video/{id}"),
            kind: PostKind::Video,
            caption: format!("demo post {id}"),
            statistics: PostStatistics {
                likes: 1234,
                favorites: 56,
                comments: 78,
                shares: 9,
            },
            published_at: chrono::Utc::now(),
            author: AuthorProfile {
                user_id: "10001".to_string(),
                handle: "demo_creator".to_string(),
                nickname: "Demo Creator".to_string(),
                sec_uid: "MS4wLjABAAAAdemo".to_string(),
                follower_count: 99_000,
                bio: "demo account".to_string(),
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
    let processor = DouyinProcessor::new(Arc::new(DemoFetcher));
    let mut task = TaskState::new(ExportCondition {
        post_ids: vec!["7300000001".into(), "7300000002".into()],
        need_media: true,
    });

    let files = run_task(&processor, &mut task, &TaskContext::default()).await?;

    println!(
        "exported {} item(s) into {} artifact(s):",
        task.data().len(),
        files.len()
    );
    for file in &files {
        match &file.payload {
            FilePayload::Buffer(bytes) => {
                println!("  {} ({} bytes, ready)", file.filename, bytes.len());
            }
            FilePayload::Url(url) => println!("  {} (download from {url})", file.filename),
            FilePayload::Zip(entries) => {
                println!("  {} (bundle of {} file(s))", file.filename, entries.len());
            }
        }
    }

    Ok(())
}
