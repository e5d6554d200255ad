//! Save timestamps carried by every persisted record.

use chrono::{DateTime, Utc};

/// Records whose timestamps are stamped explicitly on the write path.
///
/// `created_at` is set once, when the record is first saved; `updated_at` is
/// refreshed on every save.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}
