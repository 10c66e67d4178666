pub mod allocator;
pub mod capture;
pub mod stage;

pub use allocator::{Allocation, AllocationError, RedemptionAllocator};
pub use capture::{capture_sources, find_source_row, parse_amount};
pub use stage::BrowserRedemptionStage;
