//! Media upload and derivative pipeline
//!
//! Uploaded files are persisted to the flat upload directory, then videos are
//! probed and, when their codec is known to be unplayable in browsers,
//! transcoded and orientation-corrected. Every external tool failure degrades
//! to serving the previous file; only the initial write can fail an upload.
//!
//! Derivatives share the upload's base name:
//!
//! ```text
//! {uuid}_clip.mov  ->  {uuid}_clip_web.mp4  ->  {uuid}_clip_web_fixed.mp4
//! ```

pub mod derivative;
pub mod error;
pub mod orientation;
pub mod probe;
pub mod process;
pub mod reconcile;
pub mod registry;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transcode;
pub mod upload;

pub use derivative::{ChainLink, DerivativeChain};
pub use error::{PipelineError, RegistryError, ToolError, ToolKind};
pub use orientation::OrientationAdapter;
pub use probe::{CodecResult, ProbeAdapter, Rotation};
pub use process::{ExternalProcess, ProcessError, ProcessOutput, TokioProcessRunner};
pub use reconcile::{ChainListing, Reconciler, RepointReport, RepointTarget};
pub use registry::{DeletionReport, DerivativeRegistry};
pub use transcode::TranscodeAdapter;
pub use upload::{IncomingUpload, UploadOutcome, UploadPipeline};
