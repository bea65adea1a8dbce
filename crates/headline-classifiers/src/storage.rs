//! Remote object storage for model archives

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use headline_core::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub use aws_sdk_s3::config::Credentials;

/// Region used when neither the settings nor the AWS environment name one
pub const FALLBACK_REGION: &str = "us-east-1";

/// Trait for stores that can copy one object to a local file
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `bucket`/`key` to `dest`, returning the bytes written
    ///
    /// A missing object is [`Error::NotFound`], a refused read is
    /// [`Error::AccessDenied`]; anything else is [`Error::Transfer`].
    /// On error `dest` is left absent.
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// S3 (or S3-compatible) storage configuration
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    /// AWS region; the AWS environment and profile are consulted when unset
    pub region: Option<String>,

    /// Custom endpoint (MinIO, localstack); path-style addressing is used
    pub endpoint: Option<String>,

    /// Send unsigned requests (public buckets)
    pub anonymous: bool,
}

/// Object store backed by the AWS S3 SDK
///
/// Requests are never retried: a failed fetch is reported and the next
/// user action tries again.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    settings: S3Settings,
}

impl S3ObjectStore {
    /// Create a store using the default AWS credential and region chain
    ///
    /// Credentials come from the environment, `~/.aws` profiles, SSO or
    /// container and instance roles, in the SDK's usual order.
    pub async fn load(settings: S3Settings) -> Self {
        let region = aws_config::meta::region::RegionProviderChain::first_try(
            settings.region.clone().map(Region::new),
        )
        .or_default_provider()
        .or_else(Region::from_static(FALLBACK_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if settings.anonymous {
            loader = loader.no_credentials();
        }
        let sdk_config = loader.load().await;

        let builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        Self::from_builder(builder, settings)
    }

    /// Create a store with explicit static credentials
    pub fn with_credentials(settings: S3Settings, credentials: Credentials) -> Self {
        let region = settings
            .region
            .clone()
            .unwrap_or_else(|| FALLBACK_REGION.to_string());
        let builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials);
        Self::from_builder(builder, settings)
    }

    fn from_builder(mut builder: aws_sdk_s3::config::Builder, settings: S3Settings) -> Self {
        builder = builder.retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            settings,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        tracing::debug!(bucket, key, "Requesting object");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, key))?;

        let expected = output.content_length().and_then(|n| u64::try_from(n).ok());
        let result = write_body(output.body, dest, bucket, key).await.and_then(|written| {
            match expected {
                Some(expected) if expected != written => Err(Error::transfer(format!(
                    "s3://{}/{} truncated: received {} of {} bytes",
                    bucket, key, written, expected
                ))),
                _ => Ok(written),
            }
        });

        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    fn describe(&self) -> String {
        match (&self.settings.endpoint, &self.settings.region) {
            (Some(endpoint), _) => format!("s3 ({})", endpoint),
            (None, Some(region)) => format!("s3 ({})", region),
            (None, None) => "s3".to_string(),
        }
    }
}

async fn write_body(mut body: ByteStream, dest: &Path, bucket: &str, key: &str) -> Result<u64> {
    let local = |e: std::io::Error| {
        Error::transfer(format!(
            "Writing s3://{}/{} to {} failed: {}",
            bucket,
            key,
            dest.display(),
            e
        ))
    };

    let mut file = tokio::fs::File::create(dest).await.map_err(local)?;
    let mut written: u64 = 0;

    while let Some(chunk) = body.try_next().await.map_err(|e| {
        Error::transfer(format!(
            "Reading s3://{}/{} failed: {}",
            bucket,
            key,
            DisplayErrorContext(&e)
        ))
    })? {
        file.write_all(&chunk).await.map_err(local)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(local)?;

    Ok(written)
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, bucket: &str, key: &str) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err.raw_response().map(|r| r.status().as_u16()) {
        Some(404) => Error::not_found(bucket, key),
        Some(401 | 403) => Error::access_denied(bucket, key),
        Some(status) => Error::transfer(format!(
            "GET s3://{}/{} returned {}: {}",
            bucket,
            key,
            status,
            DisplayErrorContext(&err)
        )),
        None => match err {
            SdkError::ConstructionFailure(_) => Error::config(format!(
                "Could not build request for s3://{}/{} (credentials or region): {}",
                bucket,
                key,
                DisplayErrorContext(&err)
            )),
            _ => Error::transfer(format!(
                "GET s3://{}/{} failed: {}",
                bucket,
                key,
                DisplayErrorContext(&err)
            )),
        },
    }
}

/// Object store backed by a local directory laid out as `<root>/<bucket>/<key>`
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        let source = self.object_path(bucket, key);
        if !source.is_file() {
            return Err(Error::not_found(bucket, key));
        }

        let mut reader = tokio::fs::File::open(&source)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => Error::access_denied(bucket, key),
                std::io::ErrorKind::NotFound => Error::not_found(bucket, key),
                _ => Error::transfer(format!("Opening {} failed: {}", source.display(), e)),
            })?;

        let result = async {
            let mut file = tokio::fs::File::create(dest).await?;
            let copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(copied)
        }
        .await
        .map_err(|e| {
            Error::transfer(format!(
                "Copying {} to {} failed: {}",
                source.display(),
                dest.display(),
                e
            ))
        });

        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    fn describe(&self) -> String {
        format!("local ({})", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{StatusCode, Uri},
        response::{IntoResponse, Response},
        Router,
    };
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const NO_SUCH_KEY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>"#;

    const ACCESS_DENIED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"#;

    async fn fake_bucket(uri: Uri) -> Response {
        match uri.path() {
            "/models/news.zip" => (StatusCode::OK, "zip-bytes").into_response(),
            "/models/missing.zip" => (StatusCode::NOT_FOUND, NO_SUCH_KEY).into_response(),
            "/models/private.zip" => (StatusCode::FORBIDDEN, ACCESS_DENIED).into_response(),
            "/models/expired.zip" => (StatusCode::UNAUTHORIZED, ACCESS_DENIED).into_response(),
            _ => (StatusCode::BAD_REQUEST, "bad request").into_response(),
        }
    }

    async fn serve_fake_bucket() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(fake_bucket);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn store(endpoint: String) -> S3ObjectStore {
        S3ObjectStore::with_credentials(
            S3Settings {
                region: Some("eu-west-2".to_string()),
                endpoint: Some(endpoint),
                anonymous: false,
            },
            Credentials::new("AKID", "secret", None, None, "test"),
        )
    }

    #[tokio::test]
    async fn test_s3_fetch_writes_object() {
        let store = store(serve_fake_bucket().await);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("news.zip.part");

        let written = store.fetch("models", "news.zip", &dest).await.unwrap();

        assert_eq!(written, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"zip-bytes");
    }

    #[tokio::test]
    async fn test_s3_status_mapping() {
        let store = store(serve_fake_bucket().await);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.part");

        let err = store.fetch("models", "missing.zip", &dest).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");

        let err = store.fetch("models", "private.zip", &dest).await.unwrap_err();
        assert!(matches!(err, Error::AccessDenied { .. }), "{err}");

        let err = store.fetch("models", "expired.zip", &dest).await.unwrap_err();
        assert!(matches!(err, Error::AccessDenied { .. }), "{err}");

        let err = store.fetch("models", "weird.zip", &dest).await.unwrap_err();
        assert!(matches!(err, Error::Transfer(_)), "{err}");

        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_s3_truncated_body_is_transfer_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nonly-part")
                .await;
        });

        let store = store(format!("http://{}", addr));
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("news.zip.part");

        let err = store.fetch("models", "news.zip", &dest).await.unwrap_err();

        assert!(matches!(err, Error::Transfer(_)), "{err}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_transfer_error() {
        let store = store(serve_fake_bucket().await);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("no-such-dir").join("news.zip.part");

        let err = store.fetch("models", "news.zip", &dest).await.unwrap_err();

        assert!(matches!(err, Error::Transfer(_)), "{err}");
    }

    #[tokio::test]
    async fn test_describe() {
        let store = store("http://localhost:9000".to_string());
        assert_eq!(store.describe(), "s3 (http://localhost:9000)");
    }

    #[tokio::test]
    async fn test_local_store_fetch_and_not_found() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("models/spacy")).unwrap();
        std::fs::write(root.path().join("models/spacy/model.zip"), b"archive").unwrap();

        let store = LocalObjectStore::new(root.path());
        let dest = root.path().join("copy.zip");

        let written = store.fetch("models", "spacy/model.zip", &dest).await.unwrap();
        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive");

        let err = store
            .fetch("models", "missing.zip", &root.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = store
            .fetch("models", "spacy/model.zip", &root.path().join("absent/copy.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transfer(_)), "{err}");
    }
}
