pub mod episode;
pub mod show;

pub use episode::{CanonicalEpisode, EpisodeInput, EpisodePatch, ResolvedEpisode};
pub use show::{ShowInput, ShowPatch, ShowRecord};
