//! Douyin post export adapter.
//!
//! Fetches post metadata through the opaque [`PostFetcher`] seam and maps it
//! to a 15-column spreadsheet plus optional media descriptors: galleries
//! become a flat zip of numbered image URLs, videos a playback URL built
//! from the post's internal video id.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ExportConfig, FailurePolicy, VariantOrder};
use crate::error::{Error, FetchError, Result};
use crate::export::spreadsheet::{SpreadsheetPacker, export_filename};
use crate::task::{TaskContext, TaskProcessor, TaskState, run_fetch_loop};
use crate::types::{Cell, FileInfo, ItemId};

/// Playback endpoint resolving an internal video id to the media stream
const PLAYBACK_URL: &str = "https://aweme.snssdk.com/aweme/v1/play/?video_id=";

/// Maximum characters of the caption used in media filenames
const MEDIA_STEM_CAPTION_CHARS: usize = 20;

/// Spreadsheet column titles, in row-building order
const COLUMNS: [&str; 15] = [
    "Post ID",
    "Post URL",
    "Post Type",
    "Caption",
    "Likes",
    "Favorites",
    "Comments",
    "Shares",
    "Published At",
    "Author ID",
    "Author Handle",
    "Author Nickname",
    "Author URL",
    "Followers",
    "Author Bio",
];

/// Immutable input parameters for one Douyin export run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportCondition {
    /// Posts to export, in output row order
    pub post_ids: Vec<ItemId>,
    /// Also emit media descriptors per post
    pub need_media: bool,
}

/// Post content representation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// Single video post
    Video,
    /// Multi-image gallery post
    Gallery,
}

/// Engagement counters of one post
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PostStatistics {
    /// Like count
    pub likes: u64,
    /// Favorite count
    pub favorites: u64,
    /// Comment count
    pub comments: u64,
    /// Share count
    pub shares: u64,
}

/// The post author's public profile
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorProfile {
    /// Stable numeric account id
    pub user_id: String,
    /// Public handle shown in the app
    pub handle: String,
    /// Display nickname
    pub nickname: String,
    /// Opaque id used in profile URLs
    pub sec_uid: String,
    /// Follower count
    pub follower_count: u64,
    /// Profile bio text
    pub bio: String,
}

/// One gallery image with its resolution variant URLs
///
/// Variant ordering follows the platform's convention; see
/// [`VariantOrder`] on the processor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageSet {
    /// Ordered resolution variants of this image
    pub variant_urls: Vec<String>,
}

/// Playback source of a video post
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoSource {
    /// Internal video id accepted by the playback endpoint
    pub video_id: String,
}

/// Everything the export needs to know about one fetched post
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostDetail {
    /// Post id (same value as the item id it was fetched under)
    pub post_id: String,
    /// Canonical share link
    pub share_url: String,
    /// Video or gallery
    pub kind: PostKind,
    /// Caption text; first line feeds media filenames
    pub caption: String,
    /// Engagement counters
    pub statistics: PostStatistics,
    /// Publish timestamp
    pub published_at: DateTime<Utc>,
    /// Author profile
    pub author: AuthorProfile,
    /// Gallery images (empty for video posts)
    pub images: Vec<ImageSet>,
    /// Video source (None for gallery posts)
    pub video: Option<VideoSource>,
}

/// Opaque remote client seam: how a single post's metadata is fetched
///
/// Implementations own authentication, endpoints, and response decoding;
/// the processor only sees the resulting [`PostDetail`] or a classified
/// [`FetchError`].
#[async_trait]
pub trait PostFetcher: Send + Sync {
    /// Fetch one post's metadata
    async fn fetch_post(&self, id: &ItemId) -> std::result::Result<PostDetail, FetchError>;
}

/// Douyin batch export processor
pub struct DouyinProcessor {
    fetcher: Arc<dyn PostFetcher>,
    failure_policy: FailurePolicy,
    variant_order: VariantOrder,
    packer: SpreadsheetPacker,
}

impl DouyinProcessor {
    /// Create a processor with the default skip policy and the platform's
    /// documented highest-resolution-last variant ordering
    pub fn new(fetcher: Arc<dyn PostFetcher>) -> Self {
        Self {
            fetcher,
            failure_policy: FailurePolicy::default(),
            variant_order: VariantOrder::default(),
            packer: SpreadsheetPacker::default(),
        }
    }

    /// Override the per-item failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Override the image variant ordering
    pub fn with_variant_order(mut self, order: VariantOrder) -> Self {
        self.variant_order = order;
        self
    }

    /// Use the given export configuration for spreadsheet packing
    pub fn with_export_config(mut self, config: &ExportConfig) -> Self {
        self.packer = SpreadsheetPacker::new(config);
        self
    }

    /// Build the media descriptor for one post
    fn media_file(&self, post: &PostDetail) -> Result<FileInfo> {
        let stem = media_stem(post);
        match post.kind {
            PostKind::Gallery => {
                let mut entries = Vec::with_capacity(post.images.len());
                for (index, image) in post.images.iter().enumerate() {
                    let best = self.variant_order.pick_best(&image.variant_urls).ok_or_else(
                        || {
                            Error::Fetch(FetchError::Malformed(format!(
                                "gallery post {} image {} has no variants",
                                post.post_id,
                                index + 1
                            )))
                        },
                    )?;
                    // Filenames follow display order, not variant order
                    entries.push(FileInfo::url(format!("{}.png", index + 1), best.clone()));
                }
                FileInfo::zip(format!("{stem}.zip"), entries)
            }
            PostKind::Video => {
                let video = post.video.as_ref().ok_or_else(|| {
                    Error::Fetch(FetchError::Malformed(format!(
                        "video post {} has no playback source",
                        post.post_id
                    )))
                })?;
                Ok(FileInfo::url(
                    format!("{stem}.mp4"),
                    format!("{PLAYBACK_URL}{}", video.video_id),
                ))
            }
        }
    }

    /// Build one spreadsheet row; column order matches [`COLUMNS`]
    fn row(&self, id: &ItemId, post: &PostDetail) -> Vec<Cell> {
        vec![
            Cell::from(id.as_str()),
            Cell::from(post.share_url.as_str()),
            Cell::from(match post.kind {
                PostKind::Video => "video",
                PostKind::Gallery => "gallery",
            }),
            Cell::from(post.caption.as_str()),
            Cell::from(post.statistics.likes),
            Cell::from(post.statistics.favorites),
            Cell::from(post.statistics.comments),
            Cell::from(post.statistics.shares),
            Cell::from(post.published_at),
            Cell::from(post.author.user_id.as_str()),
            Cell::from(post.author.handle.as_str()),
            Cell::from(post.author.nickname.as_str()),
            Cell::from(profile_url(&post.author)),
            Cell::from(post.author.follower_count),
            Cell::from(post.author.bio.as_str()),
        ]
    }
}

#[async_trait]
impl TaskProcessor for DouyinProcessor {
    type Condition = ExportCondition;
    type Detail = PostDetail;

    async fn execute(
        &self,
        task: &mut TaskState<ExportCondition, PostDetail>,
        ctx: &TaskContext,
    ) -> Result<()> {
        let ids = task.condition().post_ids.clone();
        run_fetch_loop(task, ctx, &ids, self.failure_policy, |id| {
            let fetcher = Arc::clone(&self.fetcher);
            async move { fetcher.fetch_post(&id).await }
        })
        .await
    }

    fn file_infos(
        &self,
        task: &TaskState<ExportCondition, PostDetail>,
    ) -> Result<Vec<FileInfo>> {
        task.ensure_finished("file_infos")?;
        let condition = task.condition();

        let mut rows: Vec<Vec<Cell>> =
            vec![COLUMNS.iter().map(|title| Cell::from(*title)).collect()];
        let mut medias = Vec::new();

        // Ids absent from the data (skipped or not reached) emit nothing
        for id in &condition.post_ids {
            let Some(post) = task.get(id) else { continue };
            if condition.need_media {
                medias.push(self.media_file(post)?);
            }
            rows.push(self.row(id, post));
        }

        let workbook = self.packer.pack(&rows)?;
        let filename = export_filename("douyin", "posts", Local::now());

        let mut infos = Vec::with_capacity(1 + medias.len());
        infos.push(FileInfo::buffer(filename, workbook));
        infos.extend(medias);
        Ok(infos)
    }
}

/// Public profile URL for an author
fn profile_url(author: &AuthorProfile) -> String {
    format!("https://www.douyin.com/user/{}", author.sec_uid)
}

/// Media filename stem: truncated first caption line plus the post id
fn media_stem(post: &PostDetail) -> String {
    let first_line = post.caption.lines().next().unwrap_or("");
    let prefix: String = first_line.chars().take(MEDIA_STEM_CAPTION_CHARS).collect();
    format!("{prefix}-{}", post.post_id)
}
