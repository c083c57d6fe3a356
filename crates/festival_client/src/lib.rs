//! Festival client: streamed analysis requests and their supporting IO.
mod api;
mod catalog;
mod decode;
mod engine;
mod filename;
mod frame;
mod insights;
mod lenient;
mod persist;
mod request;
mod stream;
mod types;

pub use catalog::CatalogClient;
pub use decode::TextStreamDecoder;
pub use engine::{EngineError, EngineHandle};
pub use filename::result_filename;
pub use frame::{Frame, FrameDecoder, DEFAULT_MARKER, PARSE_FAILURE_MESSAGE};
pub use insights::{
    FestivalTrend, InsightsClient, Recommendation, RecommendationRequest, Season, SeasonalTrends,
    TrendingFestival, UnknownSeason,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use request::{
    CategoryComparisonRequest, CategoryRequest, ComparisonAnalysis, ComparisonRequest,
    KeywordAnalysis, KeywordRequest, Operation, DEFAULT_NUM_REVIEWS,
};
pub use stream::{
    ChannelEventSink, EventSink, EventStream, ReqwestStreamClient, StreamClient, StreamParser,
    StreamSettings, MISSING_TERMINAL_MESSAGE,
};
pub use types::{
    decode_result, EngineEvent, ErrorCategory, FailureKind, ProgressEvent, RequestId,
    StreamError, StreamEvent, StreamOutcome,
};
