pub mod types;
pub mod utils;
pub mod query;
pub mod normalize;
pub mod dtw;
pub mod similarity;
pub mod session;
pub mod chart;
pub mod trend;
pub mod filter;

pub use types::*;
pub use query::QueryService;
pub use dtw::StepPattern;
pub use similarity::{find_similar, ScanControl, ScanSettings, SimilarityReport, SimilarityRequest};
pub use session::{session_chart, stitch, SessionKind, SessionWindow};
pub use chart::ChartSpec;
pub use trend::{derive_base_price, make_trend};
pub use filter::{summarize_days, DailyFilter, MoveDirection, MoveFilter};
