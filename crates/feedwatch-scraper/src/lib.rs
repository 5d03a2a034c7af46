//! Browser-driven extraction of posts from an infinite-scroll community feed.

pub mod browser;
pub mod error;
pub mod relative_time;
pub mod scrape;
pub mod webdriver;

pub use browser::{Browser, BrowserLauncher, ElementHandle, Page, ResourceKind};
pub use error::ScraperError;
pub use relative_time::{resolve_relative_time, resolve_relative_time_now};
pub use scrape::{scrape_page, FeedScraper, FeedSelectors, PageScraper, ScrapeSettings};
pub use webdriver::WebDriverLauncher;
