//! S3 object store backed by aws-sdk-s3

use super::types::{ListPage, ObjectMetadata};
use super::{s3_url, ObjectStore};
use crate::config::ClientSettings;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Provider name reported for credentials taken from the environment or flags
const STATIC_PROVIDER_NAME: &str = "s3-tree-compare";

/// S3 store using one SDK client
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Wrap an existing SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from resolved per-side settings
    ///
    /// Profile, region and static credentials are applied on top of the
    /// default provider chain. An endpoint override switches to path-style
    /// addressing, which S3-compatible services generally require.
    pub async fn connect(settings: &ClientSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }

        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(creds) = &settings.static_credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                STATIC_PROVIDER_NAME,
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &settings.endpoint {
            debug!(endpoint = %endpoint, "Using S3 endpoint override");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::from_client(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        continuation: Option<String>,
    ) -> StoreResult<ListPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .delimiter(delimiter)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| {
                StoreError::request(
                    "ListObjectsV2",
                    s3_url(bucket, prefix),
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        let mut page = ListPage::default();

        for common_prefix in output.common_prefixes() {
            let name = common_prefix.prefix().ok_or_else(|| StoreError::MissingField {
                operation: "ListObjectsV2",
                target: s3_url(bucket, prefix),
                field: "common prefix",
            })?;
            page.common_prefixes.push(name.to_string());
        }

        for object in output.contents() {
            let key = object.key().ok_or_else(|| StoreError::MissingField {
                operation: "ListObjectsV2",
                target: s3_url(bucket, prefix),
                field: "object key",
            })?;
            page.keys.push(key.to_string());
        }

        if output.is_truncated().unwrap_or(false) {
            page.next_continuation = output.next_continuation_token().map(str::to_string);
        }

        Ok(page)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StoreError::request(
                    "HeadObject",
                    s3_url(bucket, key),
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        let last_modified = output
            .last_modified()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()));

        let user_metadata: BTreeMap<String, String> = output
            .metadata()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.to_lowercase(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ObjectMetadata {
            content_length: output.content_length().unwrap_or(0).max(0) as u64,
            cache_control: output.cache_control().map(str::to_string),
            content_disposition: output.content_disposition().map(str::to_string),
            content_encoding: output.content_encoding().map(str::to_string),
            content_language: output.content_language().map(str::to_string),
            content_type: output.content_type().map(str::to_string),
            e_tag: output.e_tag().map(str::to_string),
            last_modified,
            user_metadata,
        })
    }
}
