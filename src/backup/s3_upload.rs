// brutility/src/backup/s3_upload.rs
use anyhow::{Context, Result};
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::path::Path;

use crate::config::S3Settings;

/// Object key for a backup file: `<S3_PREFIX>/<file name>`, or just the file
/// name when no prefix is configured.
pub fn s3_key_for(s3_settings: &S3Settings, file_path: &Path) -> Result<String> {
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Backup path has no file name: {}", file_path.display()))?;
    Ok(match s3_settings.folder_prefix.as_deref().map(|p| p.trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, file_name),
        _ => file_name,
    })
}

/// Uploads a file to S3 (or an S3-compatible endpoint when `S3_ENDPOINT` is set).
pub async fn upload_file_to_s3(s3_settings: &S3Settings, file_path: &Path, s3_key: &str) -> Result<()> {
    println!(
        "Attempting to upload {} to S3 bucket {} with key {}",
        file_path.display(),
        s3_settings.bucket_name,
        s3_key
    );

    let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .region(Region::new(s3_settings.region.clone()))
        .credentials_provider(s3::config::Credentials::new(
            &s3_settings.access_key_id,
            &s3_settings.secret_access_key,
            None, // session_token
            None, // expiry
            "Static",
        ));
    if let Some(endpoint) = &s3_settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    let client = s3::Client::new(&sdk_config);

    let body = ByteStream::from_path(file_path)
        .await
        .with_context(|| format!("Failed to create ByteStream from file: {}", file_path.display()))?;

    client
        .put_object()
        .bucket(&s3_settings.bucket_name)
        .key(s3_key)
        .body(body)
        .send()
        .await
        .with_context(|| {
            format!(
                "Failed to upload file {} to S3 bucket {} with key {}",
                file_path.display(),
                s3_settings.bucket_name,
                s3_key
            )
        })?;

    println!(
        "✅ Successfully uploaded {} to S3 bucket {} with key {}",
        file_path.display(),
        s3_settings.bucket_name,
        s3_key
    );
    Ok(())
}
