pub mod trakt;
pub mod tvmaze;
