pub mod address_source;
pub mod aggregator;
pub mod output_manager;
pub mod session;

pub use address_source::{AddressSource, AddressStream, RegexAddressSource};
pub use aggregator::{
    ElapsedClock, ExtractionAggregator, ExtractionState, FileTally, RunOutcome, TallyRecord,
    TallyStatus, UniqueAddressSet,
};
pub use output_manager::{OutputManager, SaveSummary};
pub use session::{ExtractionSession, ExtractionSummary};
