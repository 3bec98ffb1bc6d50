//! Linkline Core - Common infrastructure for the linkage ingestion pipeline
//!
//! Shared pieces used by the relation engine, the mirror synchronizer and
//! the CLI: logging, progress reporting, shutdown signalling, work
//! distribution, retries, file streams, the shared async runtime and the Parquet sink.

pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod sink;
pub mod stream;
pub mod work_queue;

// Re-exports for convenience
pub use logging::{IndicatifLogger, NOTIFY_TARGET, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{Retryable, retry_with_backoff};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, shutdown_flag};
pub use sink::{ParquetSink, cleanup_tmp_files};
pub use stream::{SHARED_RUNTIME, StreamError, open_text_reader};
pub use work_queue::WorkQueue;
