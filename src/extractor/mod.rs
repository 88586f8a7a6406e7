pub mod models;
pub mod resolver;
pub mod traits;
pub mod youtube;

pub use models::{SourceFile, VideoIdentifier, VideoMetadata};
pub use resolver::{truncate_title, MetadataResolver, Resolution, ResolveFailure, TitlePolicy};
pub use traits::MetadataSource;
pub use youtube::YoutubeOembedSource;
