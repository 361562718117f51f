//! Page crawl: control loop, response parsing, post model, delay policy.
//!
//! The crawler walks a tag query page by page, handing each page's posts to
//! the bounded download engine and deciding when the upstream result set is
//! exhausted. Pages are strictly sequential; only downloads within a page
//! fan out.

mod crawler;
mod delay;
mod parser;
mod post;

pub use crawler::{CrawlReport, CrawlStats, Crawler};
pub use delay::{FILE_RETRY_DELAY, PAGE_RETRY_DELAY, jittered};
pub use parser::parse_posts;
pub use post::{
    ALLOWED_EXTENSIONS, IMAGE_EXTENSIONS, PostId, PostRecord, VIDEO_EXTENSIONS,
    is_image_extension, is_video_extension, normalized_extension,
};
