pub mod analysis;
pub mod cache;
pub mod confidence;
pub mod config;
pub mod error;
pub mod feed;
pub mod fixtures;
pub mod form;
pub mod goal_model;
pub mod league_params;
pub mod odds;
pub mod outcome_model;
pub mod quality;
pub mod report;
pub mod sources;
pub mod store;
pub mod synthetic_feed;
pub mod value;

pub use analysis::{AnalysisEngine, AnalysisRecord};
pub use cache::AnalysisCache;
pub use config::EngineConfig;
pub use error::EngineError;
pub use report::{LeagueReport, LeagueReporter};
