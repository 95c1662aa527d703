pub mod address;
pub use address::{AddressResolver, CompositeAddress, ResolveError};

pub mod backfill;
pub use backfill::BackfillWriter;

pub mod catalog;
pub use catalog::{
    CatalogError, CatalogStore, CrossReferences, PrimaryCatalog, SecondaryCatalog, SecondaryShow,
};

pub mod enrichment;
pub use enrichment::{ArtworkLookup, EnrichmentFetcher};

pub mod waterfall;
pub use waterfall::{Discovery, IdentityWaterfall, STRATEGIES, Strategy};

pub mod refresh;
pub use refresh::{
    BackfillReport, PipelineSettings, RefreshMode, RefreshOrchestrator, ResolutionPipeline,
    ViewResult, ViewState,
};
