pub mod advisor;
pub mod context_builder;
pub mod dataset;
pub mod embedding_index;
pub mod notifier;
pub mod output_parser;
pub mod recommendation;
pub mod seasonal;

// Re-export public types
pub use advisor::{outcome_payload, PackagingAdvisor};
pub use embedding_index::{CorpusDocument, EmbeddingIndex, Neighbor};
pub use notifier::{JsonFileExporter, PackagingListNotifier};
pub use output_parser::{parse_packaging_list, DEFAULT_PACKAGING_MATERIALS, UNKNOWN_MATERIAL};
pub use recommendation::RecommendationService;
pub use seasonal::{seasonal_window, SeasonalPlanner};
