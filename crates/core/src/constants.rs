/// Smallest amount the platform accepts for a redemption, in quote currency units.
pub const MIN_REDEMPTION_THRESHOLD: u64 = 20;

/// Price-drift detections tolerated in one purchase session before giving up.
pub const MAX_PRICE_DRIFT_RETRIES: u32 = 3;

/// Marker the platform shows once an order has been accepted.
pub const ORDER_SUCCESS_MARKER: &str = "Your order is successful";
