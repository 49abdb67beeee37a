// archive.rs — Archive-safety guard for zip/tar(.gz/.bz2/.xz) extraction.
//
// Invoked by consumers of downloaded archives (spec §4.2.6). Before and
// during extraction:
//   - member count is capped (`max_files`)
//   - total uncompressed size is capped (`max_extracted_bytes`)
//   - the compression ratio per member is capped (`max_compression_ratio`)
//   - absolute paths, `..` components, and members resolving outside the
//     destination directory are rejected (`PathTraversalError`)
//   - symlinks/hardlinks are rejected unless explicitly allowed, and even
//     then their target must stay inside the destination
//   - device files are rejected
//   - each member is streamed; if written bytes exceed `declared_size * 1.1`
//     the extraction aborts as a decompression bomb

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::paths::safe_join;

/// Safety limits applied to every archive extraction.
#[derive(Debug, Clone)]
pub struct ArchiveLimits {
    pub max_files: u64,
    pub max_extracted_bytes: u64,
    pub max_compression_ratio: u64,
    pub allow_symlinks: bool,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_files: 10_000,
            max_extracted_bytes: 10 * 1024 * 1024 * 1024,
            max_compression_ratio: 100,
            allow_symlinks: false,
        }
    }
}

/// Result of a successful, fully-validated extraction.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub files_extracted: u64,
    pub bytes_extracted: u64,
}

pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

fn detect_kind(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(ArchiveKind::TarBz2)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(ArchiveKind::TarXz)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Extract `archive_path` into `dest`, enforcing every guard in the module
/// docs. `dest` is created if it doesn't exist. On any violation, nothing
/// already written for the *current* member is left partially written, and
/// the whole extraction is aborted with an error — callers are expected to
/// remove `dest` on error (testable property: dest dir is empty on
/// `PathTraversalError`, spec scenario S6).
pub fn safe_extract(
    archive_path: &Path,
    dest: &Path,
    limits: &ArchiveLimits,
) -> Result<ExtractionReport, CoreError> {
    fs::create_dir_all(dest).map_err(|e| CoreError::io(dest, e))?;
    let kind = detect_kind(archive_path).unwrap_or(ArchiveKind::Zip);
    match kind {
        ArchiveKind::Zip => extract_zip(archive_path, dest, limits),
        ArchiveKind::Tar => {
            let file = File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
            extract_tar(file, dest, limits)
        }
        ArchiveKind::TarGz => {
            let file = File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
            extract_tar(flate2::read::GzDecoder::new(file), dest, limits)
        }
        ArchiveKind::TarBz2 => {
            let file = File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
            extract_tar(bzip2::read::BzDecoder::new(file), dest, limits)
        }
        ArchiveKind::TarXz => {
            let file = File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
            extract_tar(xz2::read::XzDecoder::new(file), dest, limits)
        }
    }
}

fn extract_zip(archive_path: &Path, dest: &Path, limits: &ArchiveLimits) -> Result<ExtractionReport, CoreError> {
    let file = File::open(archive_path).map_err(|e| CoreError::io(archive_path, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| CoreError::io(archive_path, io::Error::new(io::ErrorKind::InvalidData, e)))?;

    if zip.len() as u64 > limits.max_files {
        return Err(CoreError::ArchiveLimitExceeded {
            limit_type: "max_files",
            limit: limits.max_files,
            observed: zip.len() as u64,
        });
    }

    let mut report = ExtractionReport::default();
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| CoreError::io(archive_path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            let out_dir = safe_join(dest, &name).ok_or_else(|| CoreError::PathTraversal {
                member: name.clone(),
                dest: dest.to_path_buf(),
            })?;
            fs::create_dir_all(&out_dir).map_err(|e| CoreError::io(&out_dir, e))?;
            continue;
        }

        const S_IFLNK: u32 = 0o120000;
        let is_symlink = entry.unix_mode().map(|m| m & 0o170000 == S_IFLNK).unwrap_or(false);

        if is_symlink && !limits.allow_symlinks {
            return Err(CoreError::Symlink { member: name });
        }

        let out_path = safe_join(dest, &name).ok_or_else(|| CoreError::PathTraversal {
            member: name.clone(),
            dest: dest.to_path_buf(),
        })?;
        if limits.allow_symlinks && is_symlink {
            // Validate the link target stays inside dest before writing anything.
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(|e| CoreError::io(&out_path, e))?;
            safe_join(dest, &target).ok_or_else(|| CoreError::PathTraversal {
                member: target.clone(),
                dest: dest.to_path_buf(),
            })?;
            continue;
        }

        let declared_size = entry.size();
        let written = stream_member(&mut entry, &out_path, declared_size, &name)?;
        report.files_extracted += 1;
        report.bytes_extracted += written;
        if report.bytes_extracted > limits.max_extracted_bytes {
            return Err(CoreError::ArchiveLimitExceeded {
                limit_type: "max_extracted_bytes",
                limit: limits.max_extracted_bytes,
                observed: report.bytes_extracted,
            });
        }
        check_ratio(&name, entry.compressed_size(), written, limits)?;
    }
    Ok(report)
}

fn extract_tar<R: Read>(reader: R, dest: &Path, limits: &ArchiveLimits) -> Result<ExtractionReport, CoreError> {
    let mut archive = tar::Archive::new(reader);
    let mut report = ExtractionReport::default();
    for entry in archive.entries().map_err(|e| CoreError::io(dest, e))? {
        let mut entry = entry.map_err(|e| CoreError::io(dest, e))?;
        report.files_extracted += 1;
        if report.files_extracted > limits.max_files {
            return Err(CoreError::ArchiveLimitExceeded {
                limit_type: "max_files",
                limit: limits.max_files,
                observed: report.files_extracted,
            });
        }

        let path_in_archive = entry.path().map_err(|e| CoreError::io(dest, e))?.to_path_buf();
        let name = path_in_archive.to_string_lossy().to_string();
        let header = entry.header();

        if header.entry_type().is_symlink() || header.entry_type().is_hard_link() {
            if !limits.allow_symlinks {
                return Err(CoreError::Symlink { member: name });
            }
            if let Ok(Some(link_name)) = header.link_name() {
                let link_str = link_name.to_string_lossy().to_string();
                safe_join(dest, &link_str).ok_or_else(|| CoreError::PathTraversal {
                    member: link_str.clone(),
                    dest: dest.to_path_buf(),
                })?;
            }
            continue;
        }

        if header.entry_type().is_character_special() || header.entry_type().is_block_special() {
            return Err(CoreError::Symlink { member: name });
        }

        if header.entry_type().is_dir() {
            let out_dir = safe_join(dest, &name).ok_or_else(|| CoreError::PathTraversal {
                member: name.clone(),
                dest: dest.to_path_buf(),
            })?;
            fs::create_dir_all(&out_dir).map_err(|e| CoreError::io(&out_dir, e))?;
            continue;
        }

        let out_path = safe_join(dest, &name).ok_or_else(|| CoreError::PathTraversal {
            member: name.clone(),
            dest: dest.to_path_buf(),
        })?;
        let declared_size = header.size().unwrap_or(0);
        let written = stream_member(&mut entry, &out_path, declared_size, &name)?;
        report.bytes_extracted += written;
        if report.bytes_extracted > limits.max_extracted_bytes {
            return Err(CoreError::ArchiveLimitExceeded {
                limit_type: "max_extracted_bytes",
                limit: limits.max_extracted_bytes,
                observed: report.bytes_extracted,
            });
        }
    }
    Ok(report)
}

/// Stream a single archive member to disk, aborting early if the written
/// byte count exceeds `declared_size * 1.1` (a decompression-bomb signal
/// independent of the aggregate `max_extracted_bytes` cap).
fn stream_member<R: Read>(reader: &mut R, out_path: &Path, declared_size: u64, member: &str) -> Result<u64, CoreError> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let bomb_ceiling = (declared_size as f64 * 1.1).ceil() as u64;
    let mut out = File::create(out_path).map_err(|e| CoreError::io(out_path, e))?;
    let mut buf = [0u8; 64 * 1024];
    let mut written: u64 = 0;
    loop {
        let n = reader.read(&mut buf).map_err(|e| CoreError::io(out_path, e))?;
        if n == 0 {
            break;
        }
        written += n as u64;
        if declared_size > 0 && written > bomb_ceiling {
            drop(out);
            let _ = fs::remove_file(out_path);
            return Err(CoreError::DecompressionBomb {
                member: member.to_string(),
            });
        }
        out.write_all(&buf[..n]).map_err(|e| CoreError::io(out_path, e))?;
    }
    Ok(written)
}

fn check_ratio(member: &str, compressed: u64, uncompressed: u64, limits: &ArchiveLimits) -> Result<(), CoreError> {
    if compressed == 0 {
        return Ok(());
    }
    let ratio = uncompressed / compressed.max(1);
    if ratio > limits.max_compression_ratio {
        return Err(CoreError::ArchiveLimitExceeded {
            limit_type: "max_compression_ratio",
            limit: limits.max_compression_ratio,
            observed: ratio,
        });
    }
    let _ = member;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options =
                zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    /// Scenario S6 (spec §8): a single zip-slip entry is rejected and the
    /// destination directory stays empty.
    #[test]
    fn zip_slip_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("evil.zip");
        fs::write(&archive_path, write_zip(&[("../../etc/passwd", b"pwned")])).unwrap();

        let dest = dir.path().join("extract");
        let result = safe_extract(&archive_path, &dest, &ArchiveLimits::default());
        assert!(matches!(result, Err(CoreError::PathTraversal { .. })));
        let entries: Vec<_> = fs::read_dir(&dest).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn benign_zip_extracts_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("ok.zip");
        fs::write(&archive_path, write_zip(&[("data/file.csv", b"a,b,c\n1,2,3\n")])).unwrap();

        let dest = dir.path().join("extract");
        let report = safe_extract(&archive_path, &dest, &ArchiveLimits::default()).unwrap();
        assert_eq!(report.files_extracted, 1);
        assert!(dest.join("data/file.csv").exists());
    }

    #[test]
    fn rejects_too_many_members() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("many.zip");
        let entries: Vec<(String, Vec<u8>)> = (0..5).map(|i| (format!("f{i}.txt"), b"x".to_vec())).collect();
        let refs: Vec<(&str, &[u8])> = entries.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
        fs::write(&archive_path, write_zip(&refs)).unwrap();

        let dest = dir.path().join("extract");
        let limits = ArchiveLimits {
            max_files: 2,
            ..Default::default()
        };
        let result = safe_extract(&archive_path, &dest, &limits);
        assert!(matches!(result, Err(CoreError::ArchiveLimitExceeded { limit_type: "max_files", .. })));
    }
}
