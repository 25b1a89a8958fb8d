//! Artifact download and unpacking.
//!
//! - [`Fetcher`] / [`HttpFetcher`]: download an artifact into a scratch
//!   directory that is removed when the returned [`FetchedArtifact`] drops.
//! - [`unpack`]: turn a gzip stream or zip archive into the extension
//!   binary, verifying the output materialized.
//!
//! # Example
//!
//! ```no_run
//! use extload_core::{ArchiveFormat, ArtifactDescriptor, Compatibility, Deadline, PlatformTag};
//! use extload_fetch::{Fetcher, HttpFetcher, unpack};
//!
//! let tag = PlatformTag::resolve(Compatibility::Standard).unwrap();
//! let descriptor = ArtifactDescriptor::new(
//!     "exondb",
//!     "0.3.9",
//!     tag,
//!     ArchiveFormat::Gzip,
//!     "https://exondb-dist-prod.s3.amazonaws.com/extension",
//! );
//!
//! let deadline = Deadline::none();
//! let artifact = HttpFetcher::new().unwrap().fetch(&descriptor, &deadline).unwrap();
//! let binary = unpack(
//!     artifact.path(),
//!     descriptor.format,
//!     &descriptor.entry_name(),
//!     artifact.scratch_dir(),
//!     &deadline,
//! )
//! .unwrap();
//! println!("extension binary at {}", binary.display());
//! ```

mod copy;
mod error;
mod fetcher;
mod unpack;

pub use error::{DownloadCause, DownloadError, UnpackError, UnpackReason};
pub use fetcher::{FetchedArtifact, Fetcher, HttpFetcher, USER_AGENT, scratch_dir};
pub use unpack::unpack;
