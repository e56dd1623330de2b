mod article;
mod platform;
mod source;

pub use article::{Article, NewArticle};
pub use platform::Platform;
pub use source::{FeedSource, Locale};
