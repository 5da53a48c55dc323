pub mod client;
pub mod dispatcher;
pub mod etl;
pub mod fetcher;
pub mod pager;
pub mod pipeline;
pub mod report;
pub mod retry;

pub use crate::domain::model::{ExportResult, ExtractResult};
pub use crate::domain::ports::{ConfigProvider, KudosApi, Pipeline, Storage};
pub use crate::utils::error::Result;
