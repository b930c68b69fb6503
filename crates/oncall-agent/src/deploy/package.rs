//! Handler deployment package: a local zip or an object already in S3

use anyhow::{bail, Context, Result};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::FunctionCode;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Local(PathBuf),
    S3 { bucket: String, key: String },
}

impl PackageSource {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Deployment package cannot be empty");
        }

        if input.starts_with("s3://") {
            let (bucket, key) = parse_s3_uri(input)?;
            return Ok(PackageSource::S3 { bucket, key });
        }

        let path = PathBuf::from(input);
        if path.extension().and_then(|ext| ext.to_str()) != Some("zip") {
            bail!(
                "Deployment package '{}' must be a .zip (build it with `cargo lambda build --release --output-format zip`)",
                input
            );
        }
        Ok(PackageSource::Local(path))
    }

    /// Read the package into the shape CreateFunction expects
    pub fn function_code(&self) -> Result<FunctionCode> {
        Ok(match self {
            PackageSource::Local(path) => FunctionCode::builder()
                .zip_file(Blob::new(read_zip(path)?))
                .build(),
            PackageSource::S3 { bucket, key } => {
                FunctionCode::builder().s3_bucket(bucket).s3_key(key).build()
            }
        })
    }
}

pub(crate) fn read_zip(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read package {}", path.display()))
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSource::Local(path) => write!(f, "{}", path.display()),
            PackageSource::S3 { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
        }
    }
}

fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let path = uri.strip_prefix("s3://").context("Invalid S3 URI")?;
    let (bucket, key) = path
        .split_once('/')
        .context("S3 URI must include both bucket and key (e.g., s3://bucket/bootstrap.zip)")?;
    if bucket.is_empty() || key.is_empty() {
        bail!("S3 URI must include both bucket and key (e.g., s3://bucket/bootstrap.zip)");
    }
    Ok((bucket.to_string(), key.to_string()))
}
