// brutility/src/backup/archive.rs
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::CompressionFormat;

/// Path of the archive written for `raw`: the raw name plus the format
/// extension, e.g. `orders_backup_..sql.gz`.
pub fn archive_path_for(raw: &Path, format: CompressionFormat) -> PathBuf {
    let mut name = raw.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

fn entry_name(raw: &Path) -> Result<String> {
    raw.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Backup path has no file name: {}", raw.display()))
}

/// Wraps a raw SQL dump into an archive and removes the raw dump.
///
/// # Returns
/// Path to the created archive file.
pub fn compress_file(raw: &Path, format: CompressionFormat) -> Result<PathBuf> {
    let dest = archive_path_for(raw, format);
    println!("🗜 Compressing {} to {}", raw.display(), dest.display());

    let archive_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&dest)
        .with_context(|| format!("Failed to create archive file: {}", dest.display()))?;
    let mut source = File::open(raw).with_context(|| format!("Failed to open dump file: {}", raw.display()))?;

    match format {
        CompressionFormat::Gz => {
            let mut encoder = GzEncoder::new(archive_file, Compression::default());
            io::copy(&mut source, &mut encoder)
                .with_context(|| format!("Failed to write gzip stream: {}", dest.display()))?;
            encoder
                .finish()
                .with_context(|| format!("Failed to finish Gzip encoding for archive: {}", dest.display()))?;
        }
        CompressionFormat::Tar => {
            let mut builder = tar::Builder::new(archive_file);
            builder
                .append_file(entry_name(raw)?, &mut source)
                .with_context(|| format!("Failed to append {} to tar archive", raw.display()))?;
            builder
                .into_inner()
                .with_context(|| format!("Failed to finish tar archive: {}", dest.display()))?;
        }
        CompressionFormat::Zip => {
            let mut writer = ZipWriter::new(archive_file);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(true);
            writer
                .start_file(entry_name(raw)?, options)
                .with_context(|| format!("Failed to start zip entry in {}", dest.display()))?;
            io::copy(&mut source, &mut writer)
                .with_context(|| format!("Failed to write zip entry in {}", dest.display()))?;
            writer
                .finish()
                .with_context(|| format!("Failed to finish zip archive: {}", dest.display()))?;
        }
    }

    fs::remove_file(raw).with_context(|| format!("Failed to remove raw dump: {}", raw.display()))?;
    println!("✓ Archive created successfully at {}", dest.display());
    Ok(dest)
}

/// Extracts the SQL dump held in `archive` into a temporary file.
///
/// Tar and zip archives are expected to hold the dump as their first file
/// entry. The temporary file is deleted when the handle is dropped.
pub fn extract_sql(archive: &Path, format: CompressionFormat) -> Result<NamedTempFile> {
    let mut out = tempfile::Builder::new()
        .prefix("brutility-restore-")
        .suffix(".sql")
        .tempfile()
        .context("Failed to create temporary file for extracted dump")?;
    let file = File::open(archive).with_context(|| format!("Failed to open archive file: {}", archive.display()))?;

    println!("Extracting {} archive {}", format.extension(), archive.display());
    match format {
        CompressionFormat::Gz => {
            io::copy(&mut GzDecoder::new(file), &mut out)
                .with_context(|| format!("Failed to decompress {}", archive.display()))?;
        }
        CompressionFormat::Tar => {
            let mut tar_archive = tar::Archive::new(file);
            let mut found = false;
            for entry in tar_archive
                .entries()
                .with_context(|| format!("Failed to read tar archive {}", archive.display()))?
            {
                let mut entry = entry.with_context(|| format!("Corrupt entry in {}", archive.display()))?;
                if entry.header().entry_type().is_file() {
                    io::copy(&mut entry, &mut out)
                        .with_context(|| format!("Failed to extract from {}", archive.display()))?;
                    found = true;
                    break;
                }
            }
            if !found {
                anyhow::bail!("Tar archive {} contains no file", archive.display());
            }
        }
        CompressionFormat::Zip => {
            let mut zip_archive =
                ZipArchive::new(file).with_context(|| format!("Failed to read zip archive {}", archive.display()))?;
            if zip_archive.len() == 0 {
                anyhow::bail!("Zip archive {} contains no file", archive.display());
            }
            let mut entry = zip_archive
                .by_index(0)
                .with_context(|| format!("Failed to open first entry of {}", archive.display()))?;
            io::copy(&mut entry, &mut out).with_context(|| format!("Failed to extract from {}", archive.display()))?;
        }
    }
    out.flush()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &[u8] = b"-- MySQL dump\nCREATE TABLE orders (id INT);\nINSERT INTO orders VALUES (1),(2);\n";

    #[test]
    fn test_each_format_replaces_raw_and_extracts_back() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for format in [CompressionFormat::Zip, CompressionFormat::Tar, CompressionFormat::Gz] {
            let raw = dir.path().join(format!("orders_backup_{}.sql", format.extension()));
            fs::write(&raw, DUMP)?;

            let archive = compress_file(&raw, format)?;
            assert!(!raw.exists(), "{:?} left the raw dump behind", format);
            let expected = format!("orders_backup_{0}.sql.{0}", format.extension());
            assert_eq!(archive, dir.path().join(expected));

            let extracted = extract_sql(&archive, format)?;
            assert_eq!(fs::read(extracted.path())?, DUMP, "{:?} did not round-trip", format);
        }
        Ok(())
    }

    #[test]
    fn test_garbage_archive_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bogus = dir.path().join("orders_backup_x.sql.zip");
        fs::write(&bogus, b"not a zip")?;
        assert!(extract_sql(&bogus, CompressionFormat::Zip).is_err());
        Ok(())
    }
}
