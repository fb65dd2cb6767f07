//! Cross-cutting building blocks shared by every layer.

pub mod clock;
pub mod errors;
pub mod locks;
pub mod money;
pub mod pagination;
pub mod retry;
pub mod shutdown;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use errors::{AppError, DomainError, ErrorKind, InfraError};
pub use locks::{KeyedGuard, KeyedLocks};
pub use pagination::{PageRequest, PaginatedResult};
pub use retry::{retry_with_backoff, RetryConfig};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
