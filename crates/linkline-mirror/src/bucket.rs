//! S3 export bucket on the AWS SDK
//!
//! Listing pages through ListObjectsV2 continuation tokens; objects are
//! streamed chunk by chunk. Calls run on the shared runtime so rayon
//! workers can drive them synchronously.

use std::io::Write;
use std::path::{Path, PathBuf};

use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use linkline_core::{SHARED_RUNTIME, StreamError};
use serde::Deserialize;

use crate::error::MirrorError;
use crate::source::{ObjectSource, RemoteObject};

/// Region used when neither the settings nor the environment name one.
const DEFAULT_REGION: &str = "us-east-1";

/// Split `s3://bucket/prefix` into bucket and normalized prefix.
pub fn parse_bucket_url(url: &str) -> Result<(String, String), MirrorError> {
    let bad = |reason: &str| MirrorError::BadUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    let rest = url
        .strip_prefix("s3://")
        .ok_or_else(|| bad("expected s3://{bucket}/{prefix}"))?;
    let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(bad("could not get bucket name"));
    }
    Ok((bucket.to_string(), normalize_prefix(prefix)))
}

/// Strip leading slashes and ensure a trailing one; the empty prefix stays empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_start_matches('/');
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// How requests to the bucket are signed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BucketAuth {
    /// Standard provider chain: environment, shared config files, instance roles.
    #[default]
    Environment,
    /// Unsigned requests, for public buckets.
    Anonymous,
    Keys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// Named profile from the shared AWS config files.
    Profile(String),
}

impl BucketAuth {
    /// Static keys; giving only one half of the pair is an error.
    pub fn from_keys(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        session_token: Option<String>,
    ) -> Result<Option<Self>, MirrorError> {
        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Some(Self::Keys {
                access_key_id,
                secret_access_key,
                session_token,
            })),
            (None, None) => Ok(None),
            _ => Err(MirrorError::Credentials(
                "access key id and secret access key must be given together".to_string(),
            )),
        }
    }

    /// Read a JSON credentials file holding either a key pair or a profile name:
    ///
    /// ```json
    /// {"aws_access_key_id": "...", "aws_secret_access_key": "..."}
    /// ```
    pub fn from_credentials_file(path: &Path) -> Result<Self, MirrorError> {
        log::debug!("reading bucket credentials from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| MirrorError::io(path, e))?;
        let file: CredentialsFile = serde_json::from_str(&text).map_err(|e| {
            MirrorError::Credentials(format!("{}: {e}", path.display()))
        })?;
        if let Some(keys) = Self::from_keys(
            file.aws_access_key_id,
            file.aws_secret_access_key,
            file.aws_session_token,
        )? {
            return Ok(keys);
        }
        file.profile_name.map(Self::Profile).ok_or_else(|| {
            MirrorError::Credentials(format!(
                "{}: neither a key pair nor a profile name",
                path.display()
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_session_token: Option<String>,
    profile_name: Option<String>,
}

/// Credential sources as configured; the first one present wins.
#[derive(Debug, Clone, Default)]
pub struct CredentialSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub profile: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub anonymous: bool,
}

impl CredentialSettings {
    /// Key pair, then profile, then credentials file, then anonymous access.
    /// With none of them the standard provider chain applies.
    pub fn resolve(&self) -> Result<BucketAuth, MirrorError> {
        if let Some(keys) = BucketAuth::from_keys(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            None,
        )? {
            return Ok(keys);
        }
        if let Some(profile) = &self.profile {
            return Ok(BucketAuth::Profile(profile.clone()));
        }
        if let Some(path) = &self.credentials_file {
            return BucketAuth::from_credentials_file(path);
        }
        if self.anonymous {
            return Ok(BucketAuth::Anonymous);
        }
        Ok(BucketAuth::Environment)
    }
}

#[derive(Debug, Clone)]
pub struct BucketSettings {
    pub bucket: String,
    /// S3-compatible endpoint (MinIO, Ceph); AWS when unset
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub auth: BucketAuth,
}

#[derive(Debug, Clone)]
pub struct S3Bucket {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
}

impl S3Bucket {
    pub fn connect(settings: &BucketSettings) -> Self {
        let client = SHARED_RUNTIME.handle().block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            loader = match &settings.region {
                Some(region) => loader.region(Region::new(region.clone())),
                None => loader.region(
                    RegionProviderChain::default_provider().or_else(Region::new(DEFAULT_REGION)),
                ),
            };
            if let Some(endpoint) = &settings.endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            loader = match &settings.auth {
                BucketAuth::Environment => loader,
                BucketAuth::Anonymous => loader.no_credentials(),
                BucketAuth::Keys {
                    access_key_id,
                    secret_access_key,
                    session_token,
                } => loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    session_token.clone(),
                    None,
                    "linkline",
                )),
                BucketAuth::Profile(name) => loader.profile_name(name),
            };
            let sdk_config = loader.load().await;

            let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
            if settings.endpoint.is_some() {
                s3_config = s3_config.force_path_style(true);
            }
            Client::from_conf(s3_config.build())
        });
        Self {
            client,
            bucket: settings.bucket.clone(),
            endpoint: settings.endpoint.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// HTTP status, when the service answered, plus the full error chain.
fn sdk_error<E>(err: &SdkError<E, HttpResponse>) -> StreamError
where
    E: std::error::Error + 'static,
{
    StreamError::Http {
        status: err.raw_response().map(|r| r.status().as_u16()),
        message: DisplayErrorContext(err).to_string(),
    }
}

impl ObjectSource for S3Bucket {
    fn describe(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("s3://{} at {endpoint}", self.bucket),
            None => format!("s3://{}", self.bucket),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, MirrorError> {
        let mut objects = SHARED_RUNTIME.handle().block_on(async {
            let mut objects = Vec::new();
            let mut continuation_token: Option<String> = None;
            loop {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(prefix);
                if let Some(token) = continuation_token.take() {
                    request = request.continuation_token(token);
                }
                let page = request.send().await.map_err(|e| sdk_error(&e))?;
                objects.extend(page.contents().iter().filter_map(|o| {
                    Some(RemoteObject {
                        key: o.key()?.to_string(),
                        size: o.size().unwrap_or(0).max(0) as u64,
                    })
                }));
                match page.next_continuation_token() {
                    Some(token) => continuation_token = Some(token.to_string()),
                    None => break,
                }
            }
            Ok::<_, MirrorError>(objects)
        })?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        log::debug!("{}: {} objects under '{prefix}'", self.describe(), objects.len());
        Ok(objects)
    }

    fn fetch(&self, key: &str, out: &mut dyn Write) -> Result<u64, MirrorError> {
        SHARED_RUNTIME.handle().block_on(async {
            let response = self.client.get_object().bucket(&self.bucket).key(key).send().await;
            let mut body = match response {
                Ok(output) => output.body,
                Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                    return Err(MirrorError::NotFound(key.to_string()));
                }
                Err(e) => return Err(sdk_error(&e).into()),
            };
            let mut written = 0u64;
            while let Some(chunk) = body.try_next().await.map_err(|e| StreamError::Http {
                status: None,
                message: format!("reading s3://{}/{key}: {e}", self.bucket),
            })? {
                out.write_all(&chunk).map_err(StreamError::Io)?;
                written += chunk.len() as u64;
            }
            Ok(written)
        })
    }
}
