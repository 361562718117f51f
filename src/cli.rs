//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use tagmirror_core::{CrawlConfig, DEFAULT_MAX_RETRIES, DEFAULT_WORKERS};

/// Mirror a tag-filtered media feed into a local browsable collection.
///
/// Tagmirror walks a paginated upstream post API for a tag expression,
/// downloads every referenced file that is not already on disk, generates
/// thumbnails for images, and writes a JSON catalog of the collection.
#[derive(Parser, Debug)]
#[command(name = "tagmirror")]
#[command(author, version, about)]
pub struct Args {
    /// Tag expression to mirror (upstream search syntax)
    pub tags: String,

    /// Base URL of the upstream post API endpoint
    #[arg(long)]
    pub api_base: String,

    /// Directory for downloaded originals
    #[arg(short = 'o', long, default_value = "media")]
    pub media_dir: PathBuf,

    /// Directory for generated thumbnails
    #[arg(long, default_value = "thumbs")]
    pub thumb_dir: PathBuf,

    /// Disable thumbnail generation
    #[arg(long)]
    pub no_thumbs: bool,

    /// Posts requested per page (1-1000)
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_size: u32,

    /// Zero-based page cursor to start from
    #[arg(long, default_value_t = 0)]
    pub start_page: u64,

    /// API key appended to page requests
    #[arg(long, env = "TAGMIRROR_API_KEY")]
    pub api_key: Option<String>,

    /// User id appended to page requests
    #[arg(long, env = "TAGMIRROR_USER_ID")]
    pub user_id: Option<String>,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Attempts per request before giving up (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Consecutive empty pages that end the crawl (1-1000)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub empty_page_limit: u32,

    /// Consecutive failed pages that end the crawl (1-1000)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub failed_page_limit: u32,

    /// Base delay between page fetches in milliseconds (0-60000)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub page_delay_ms: u64,

    /// Thumbnail bounding-box width in pixels
    #[arg(long, default_value_t = 320)]
    pub thumb_width: u32,

    /// Thumbnail bounding-box height in pixels
    #[arg(long, default_value_t = 426)]
    pub thumb_height: u32,

    /// Thumbnail JPEG quality (1-100)
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub thumb_quality: u8,

    /// Output path for the catalog manifest
    #[arg(long, default_value = "catalog.json")]
    pub catalog: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the crawl configuration from the parsed arguments.
    pub fn to_config(&self) -> CrawlConfig {
        let mut config = CrawlConfig::new(self.api_base.clone(), self.tags.clone());
        config.media_dir = self.media_dir.clone();
        config.thumb_dir = self.thumb_dir.clone();
        config.generate_thumbs = !self.no_thumbs;
        config.page_size = self.page_size;
        config.start_page = self.start_page;
        config.api_key = self.api_key.clone();
        config.user_id = self.user_id.clone();
        config.workers = usize::from(self.concurrency);
        config.max_retries = u32::from(self.max_retries);
        config.empty_page_limit = self.empty_page_limit;
        config.failed_page_limit = self.failed_page_limit;
        config.page_delay = Duration::from_millis(self.page_delay_ms);
        config.thumb.max_width = self.thumb_width;
        config.thumb.max_height = self.thumb_height;
        config.thumb.quality = self.thumb_quality;
        config.catalog_path = self.catalog.clone();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec!["tagmirror", "blue_sky", "--api-base", "https://api.example.com/index.php"]
    }

    fn parse(extra: &[&str]) -> Args {
        let mut argv = base_args();
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_default_args_parse_successfully() {
        let args = parse(&[]);
        assert_eq!(args.tags, "blue_sky");
        assert_eq!(args.api_base, "https://api.example.com/index.php");
        assert_eq!(args.concurrency, 8);
        assert_eq!(args.max_retries, 3);
        assert_eq!(args.page_size, 200);
        assert_eq!(args.empty_page_limit, 10);
        assert_eq!(args.failed_page_limit, 5);
        assert_eq!(args.page_delay_ms, 1000);
        assert!(!args.no_thumbs);
        assert!(!args.quiet);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_cli_missing_tags_rejected() {
        let result = Args::try_parse_from(["tagmirror", "--api-base", "https://x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_missing_api_base_rejected() {
        let result = Args::try_parse_from(["tagmirror", "blue_sky"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        assert_eq!(parse(&["-v"]).verbose, 1);
        assert_eq!(parse(&["-vv"]).verbose, 2);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert_eq!(parse(&["-c", "1"]).concurrency, 1);
        assert_eq!(parse(&["-c", "100"]).concurrency, 100);

        let mut argv = base_args();
        argv.extend_from_slice(&["-c", "0"]);
        let result = Args::try_parse_from(argv);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_max_retries_over_max_rejected() {
        let mut argv = base_args();
        argv.extend_from_slice(&["-r", "11"]);
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_cli_page_delay_zero_allowed() {
        assert_eq!(parse(&["--page-delay-ms", "0"]).page_delay_ms, 0);
    }

    #[test]
    fn test_to_config_maps_all_fields() {
        let args = parse(&[
            "--media-dir",
            "originals",
            "--thumb-dir",
            "previews",
            "--no-thumbs",
            "--page-size",
            "42",
            "--start-page",
            "7",
            "--api-key",
            "k",
            "--user-id",
            "u",
            "-c",
            "4",
            "-r",
            "2",
            "--empty-page-limit",
            "3",
            "--failed-page-limit",
            "2",
            "--page-delay-ms",
            "250",
            "--thumb-quality",
            "70",
            "--catalog",
            "out/catalog.json",
        ]);
        let config = args.to_config();
        assert_eq!(config.media_dir, PathBuf::from("originals"));
        assert_eq!(config.thumb_dir, PathBuf::from("previews"));
        assert!(!config.generate_thumbs);
        assert_eq!(config.page_size, 42);
        assert_eq!(config.start_page, 7);
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.user_id.as_deref(), Some("u"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.empty_page_limit, 3);
        assert_eq!(config.failed_page_limit, 2);
        assert_eq!(config.page_delay, Duration::from_millis(250));
        assert_eq!(config.thumb.quality, 70);
        assert_eq!(config.catalog_path, PathBuf::from("out/catalog.json"));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["tagmirror", "--help"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }
}
