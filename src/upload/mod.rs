//! The `put` pipeline.
//!
//! An upload runs four phases in order, and each phase has its own failure:
//!
//! | Phase    | Work                                   | Failure                  |
//! |----------|----------------------------------------|--------------------------|
//! | resolve  | turn the [`UploadSource`] into a stream | `SourceNotFound`         |
//! | open     | open the remote destination            | `DestinationUnreachable` |
//! | pump     | write chunks until the stream ends     | `TransferFailure`        |
//! | finalize | close and wait for the acknowledgment  | `TransferFailure`        |
//!
//! Arguments are checked before the first phase and rejected with
//! `InvalidOptions`.

mod encoding;
mod options;
mod progress;
mod source;
mod uploader;

pub use encoding::Encoding;
pub use options::{parse_permissions, ProgressCallback, UploadOptions};
pub use progress::{ProgressTracker, TrackingHandle, UploadProgress};
pub use source::{ByteStream, SourceKind, UploadSource};
pub use uploader::{Completion, Uploader};
