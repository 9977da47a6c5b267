//! Concrete enrichment stages in pipeline order:
//! parse, fetch-asset, describe (optional), embed, persist.

mod describe;
mod embed;
mod fetch;
mod parse;
mod persist;

pub use describe::DescribeStage;
pub use embed::EmbedStage;
pub use fetch::FetchStage;
pub use parse::ParseStage;
pub use persist::PersistStage;
