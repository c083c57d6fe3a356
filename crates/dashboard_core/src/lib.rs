//! Dashboard core: pure page controller, view-model helpers and chart statistics.
mod effect;
mod msg;
mod state;
pub mod stats;
mod summary;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, Phase};
pub use summary::{summarize, KeywordSummary, ResultSummary};
pub use update::update;
pub use view_model::{AppViewModel, ErrorView};
