//! Portfolio analytics over a [`PortfolioSnapshot`](crate::types::PortfolioSnapshot).

pub mod alerts;
pub mod covenant_trends;
pub mod heatmap;
pub mod parallel;
pub mod summary;
pub mod value;

pub use alerts::{critical_alerts, open_alerts, AlertFilter};
pub use covenant_trends::{covenant_trends, CovenantTrends, StatusCounts};
pub use heatmap::{risk_heatmap, RiskHeatmapItem};
pub use parallel::{maybe_parallel_fold, maybe_parallel_map};
pub use summary::{summarize, PortfolioSummary};
pub use value::{portfolio_trends, portfolio_value, PortfolioTrends, PortfolioValue};
