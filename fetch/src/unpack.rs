//! Artifact decompression.
//!
//! Two container formats are supported:
//!
//! - [`ArchiveFormat::Gzip`]: the artifact is a gzip stream of the binary;
//!   the decompressed bytes are written to `{out_dir}/{entry_name}`.
//! - [`ArchiveFormat::Zip`]: the entry whose name matches `entry_name`
//!   exactly is extracted to `{out_dir}/{entry_name}`.
//!
//! In both cases the output must exist and be non-empty afterwards, otherwise
//! the result is [`UnpackReason::MissingOutput`]. `out_dir` is created if
//! needed, and an output path equal to the artifact path is rejected before
//! anything is written.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use extload_core::{ArchiveFormat, Deadline};
use flate2::read::GzDecoder;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::copy::copy_with_deadline;
use crate::error::{UnpackError, UnpackReason};

/// Unpacks `artifact` into `out_dir`, returning the path of the extension
/// binary.
///
/// # Errors
///
/// Returns an [`UnpackError`] naming `artifact` when the container cannot be
/// read, the entry is absent, the deadline expires, the output would replace
/// the artifact, or the output is empty. Partial output is removed before
/// returning an error.
pub fn unpack(
    artifact: &Path,
    format: ArchiveFormat,
    entry_name: &str,
    out_dir: &Path,
    deadline: &Deadline,
) -> Result<PathBuf, UnpackError> {
    let fail = |reason| UnpackError::new(artifact, reason);

    if !is_plain_file_name(entry_name) {
        return Err(fail(UnpackReason::InvalidEntryName(entry_name.to_string())));
    }
    let output = out_dir.join(entry_name);
    if output == artifact {
        return Err(fail(UnpackReason::OverwritesArtifact(output)));
    }
    std::fs::create_dir_all(out_dir).map_err(|err| fail(err.into()))?;

    let result = match format {
        ArchiveFormat::Gzip => unpack_gzip(artifact, &output, deadline),
        ArchiveFormat::Zip => unpack_zip(artifact, entry_name, &output, deadline),
    }
    .and_then(|()| verify_output(&output));

    match result {
        Ok(()) => {
            debug!(artifact = %artifact.display(), output = %output.display(), "unpacked artifact");
            Ok(output)
        }
        Err(reason) => {
            let _ = std::fs::remove_file(&output);
            Err(fail(reason))
        }
    }
}

fn unpack_gzip(artifact: &Path, output: &Path, deadline: &Deadline) -> Result<(), UnpackReason> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(artifact)?));
    let mut writer = BufWriter::new(File::create(output)?);
    copy_with_deadline(&mut decoder, &mut writer, deadline, |_| {}).map_err(io_reason)?;
    Ok(())
}

fn unpack_zip(
    artifact: &Path,
    entry_name: &str,
    output: &Path,
    deadline: &Deadline,
) -> Result<(), UnpackReason> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(artifact)?))?;
    let mut entry = match archive.by_name(entry_name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(UnpackReason::MissingEntry(entry_name.to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    let mut writer = BufWriter::new(File::create(output)?);
    copy_with_deadline(&mut entry, &mut writer, deadline, |_| {}).map_err(io_reason)?;
    Ok(())
}

fn verify_output(output: &Path) -> Result<(), UnpackReason> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(UnpackReason::MissingOutput),
    }
}

fn io_reason(err: io::Error) -> UnpackReason {
    if err.kind() == io::ErrorKind::TimedOut {
        UnpackReason::TimedOut
    } else {
        UnpackReason::Io(err)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}
