//! # Expiry Sweeper
//!
//! Lifecycle engine for directories whose files should age out after a fixed
//! expiry window.
//!
//! The filesystem is the only source of truth: nothing is cached between
//! operations, and every component re-reads modification times when it needs
//! them. The sweeper and the listing annotator never coordinate; both apply
//! the same [`ExpiryPolicy`] independently.
//!
//! ## Features
//!
//! - **Expiry Policy**: pure verdict computation with an inclusive boundary and
//!   an explicit "disabled" state for a zero duration
//! - **Sweeper**: recursive walk that deletes expired files, never directories,
//!   and isolates per-entry failures
//! - **Scheduler**: runs the sweeper on a fixed interval, cancellable between passes
//! - **Listing Annotator**: remaining-time-or-expired labels for directory listings
//! - **Path Security**: request path cleaning and containment checks
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use expiry_sweeper::{ExpiryPolicy, SweepScheduler, Sweeper};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sweeper = Sweeper::new(ExpiryPolicy::from_hours(2));
//!
//! // One pass right now
//! let report = sweeper.sweep_async("/srv/uploads".into()).await?;
//! println!("deleted {} files", report.deleted);
//!
//! // Or every minute until cancelled
//! let token = CancellationToken::new();
//! let handle = SweepScheduler::new(sweeper, "/srv/uploads".into(), Duration::from_secs(60))
//!     .spawn(token.clone());
//! token.cancel();
//! handle.await?;
//! # Ok(())
//! # }
//! ```

pub mod annotator;
pub mod clock;
pub mod error;
pub mod policy;
pub mod scheduler;
pub mod security;
pub mod sweeper;

pub use annotator::{ExpiryLabel, FileEntry, ListingAnnotator, ListingEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, SweeperError};
pub use policy::{ExpiryPolicy, ExpiryVerdict};
pub use scheduler::{DEFAULT_SWEEP_INTERVAL, SweepScheduler, SweepStatus};
pub use sweeper::{OsFs, SweepFs, SweepReport, Sweeper};

// Re-export commonly used types
pub use std::time::Duration;
