pub mod patterns;
pub mod post_scan;
pub mod pre_scan;

pub use patterns::{FilterDef, FilterKind, PatternBank, PatternDef, SignalClass};
pub use post_scan::{PostScanFinding, PostScanFindingKind, PostScanReport, post_scan};
pub use pre_scan::{HistoryTurn, Indicators, PreScanReport, TurnRole, pre_scan};
