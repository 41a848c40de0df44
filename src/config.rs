//! Configuration types for s3-tree-compare
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - S3 URL parsing
//! - Per-side client settings resolved from environment and flags
//! - Runtime configuration with validation

use crate::compare::IgnoredHeaders;
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Default maximum number of concurrent calls in flight per bucket
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Regex for parsing S3 URLs
static S3_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches: s3://bucket or s3://bucket/any/prefix
    Regex::new(r"^s3://([^/]*)(?:/(.*))?$").expect("Invalid S3 URL regex")
});

/// Compare two S3 paths by listing and object metadata
#[derive(Parser, Debug, Clone)]
#[command(
    name = "s3-tree-compare",
    version,
    about = "Compare two S3 paths for differences by examining metadata",
    long_about = "Compare two S3 paths for differences by examining metadata (without downloading objects).\n\n\
                  This calls HeadObject on each object found in both paths. Two objects are\n\
                  considered different if one is missing, the content lengths do not match,\n\
                  or any of these headers differ (unless ignored via --ignore-header):\n\
                  ETag, Cache-Control, Content-Disposition, Content-Encoding,\n\
                  Content-Language, Content-Type and x-amz-meta-* headers.",
    after_help = "EXAMPLES:\n    \
        s3-tree-compare s3://bucket1/path1/ s3://bucket2/path2/\n    \
        s3-tree-compare s3://src/data/ s3://dst/data/ --format json -o diff.json -p\n    \
        s3-tree-compare s3://src/ s3://mirror/ --ignore-header etag --concurrency 64\n    \
        s3-tree-compare s3://a/ s3://b/ --endpoint2 http://localhost:9000 --region2 us-east-1"
)]
pub struct CliArgs {
    /// First S3 location (s3://bucket/prefix/)
    #[arg(value_name = "FIRST")]
    pub first: String,

    /// Second S3 location (s3://bucket/prefix/)
    #[arg(value_name = "SECOND")]
    pub second: String,

    /// S3 endpoint to use for both buckets
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override S3 endpoint for the first bucket
    #[arg(long, value_name = "URL")]
    pub endpoint1: Option<String>,

    /// Override S3 endpoint for the second bucket
    #[arg(long, value_name = "URL")]
    pub endpoint2: Option<String>,

    /// AWS credential profile to use for both buckets
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Override AWS credential profile for the first bucket
    #[arg(long, value_name = "NAME")]
    pub profile1: Option<String>,

    /// Override AWS credential profile for the second bucket
    #[arg(long, value_name = "NAME")]
    pub profile2: Option<String>,

    /// Region for both buckets
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Override region for the first bucket
    #[arg(long, value_name = "REGION")]
    pub region1: Option<String>,

    /// Override region for the second bucket
    #[arg(long, value_name = "REGION")]
    pub region2: Option<String>,

    /// Maximum concurrent S3 calls in flight per bucket
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY, value_name = "NUM")]
    pub concurrency: usize,

    /// Header to ignore when deciding whether objects differ (can be repeated)
    #[arg(long = "ignore-header", value_name = "HEADER", action = clap::ArgAction::Append)]
    pub ignore_headers: Vec<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write output to the specified file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Show a progress spinner and summary on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Flag values for one side: the shared flag, then the side override
    fn side_flags(&self, side: usize) -> [SideFlags<'_>; 2] {
        let shared = SideFlags {
            profile: self.profile.as_deref(),
            region: self.region.as_deref(),
            endpoint: self.endpoint.as_deref(),
        };
        let specific = match side {
            1 => SideFlags {
                profile: self.profile1.as_deref(),
                region: self.region1.as_deref(),
                endpoint: self.endpoint1.as_deref(),
            },
            _ => SideFlags {
                profile: self.profile2.as_deref(),
                region: self.region2.as_deref(),
                endpoint: self.endpoint2.as_deref(),
            },
        };
        [shared, specific]
    }
}

#[derive(Debug, Clone, Copy)]
struct SideFlags<'a> {
    profile: Option<&'a str>,
    region: Option<&'a str>,
    endpoint: Option<&'a str>,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Unified-diff-like text
    Text,
    /// A single JSON array of reports
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Parsed S3 URL components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Url {
    /// Bucket name
    pub bucket: String,

    /// Key prefix within the bucket (may be empty)
    pub prefix: String,
}

impl S3Url {
    /// Parse an S3 URL string
    ///
    /// Accepts `s3://bucket`, `s3://bucket/` and `s3://bucket/prefix`.
    /// The prefix is used verbatim, so `s3://b/data` and `s3://b/data/`
    /// compare different key sets.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();

        let caps = S3_URL_REGEX.captures(url).ok_or_else(|| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: "S3 URL must begin with s3://".into(),
        })?;

        let bucket = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if bucket.is_empty() {
            return Err(ConfigError::InvalidUrl {
                url: url.to_string(),
                reason: "Empty bucket name".into(),
            });
        }

        let prefix = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }
}

impl fmt::Display for S3Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Access keys supplied through the environment
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// Client settings for one side of the comparison
///
/// Anything left `None` falls through to the SDK's default provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub static_credentials: Option<StaticCredentials>,
}

impl ClientSettings {
    /// Resolve settings for `side` (1 or 2)
    ///
    /// Environment variables are read with the suffixes `""` then `"<side>"`,
    /// later suffixes overriding earlier ones; flags then override the
    /// environment the same way. A profile given by flag discards static
    /// credentials taken from the environment.
    pub fn resolve<F>(args: &CliArgs, side: usize, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.is_empty());
        let mut settings = ClientSettings::default();

        for suffix in ["".to_string(), side.to_string()] {
            if let Some(profile) = env(&format!("AWS_PROFILE{}", suffix)) {
                settings.profile = Some(profile);
            }

            let region = env(&format!("AWS_REGION{}", suffix))
                .or_else(|| env(&format!("AWS_DEFAULT_REGION{}", suffix)));
            if region.is_some() {
                settings.region = region;
            }

            let access_key = env(&format!("AWS_ACCESS_KEY_ID{}", suffix))
                .or_else(|| env(&format!("AWS_ACCESS_KEY{}", suffix)));
            let secret_key = env(&format!("AWS_SECRET_ACCESS_KEY{}", suffix));

            if let (Some(access_key_id), Some(secret_access_key)) = (access_key, secret_key) {
                settings.static_credentials = Some(StaticCredentials {
                    access_key_id,
                    secret_access_key,
                    session_token: env(&format!("AWS_SESSION_TOKEN{}", suffix)),
                });
            }
        }

        for flags in args.side_flags(side) {
            if let Some(profile) = flags.profile {
                settings.profile = Some(profile.to_string());
                settings.static_credentials = None;
            }
            if let Some(region) = flags.region {
                settings.region = Some(region.to_string());
            }
            if let Some(endpoint) = flags.endpoint {
                settings.endpoint = Some(endpoint.to_string());
            }
        }

        if settings.endpoint.is_some() && settings.region.is_none() {
            return Err(ConfigError::EndpointWithoutRegion { side });
        }

        Ok(settings)
    }
}

/// Where reports are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("stdout"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// First location
    pub first: S3Url,

    /// Second location
    pub second: S3Url,

    /// Client settings for the first location
    pub first_client: ClientSettings,

    /// Client settings for the second location
    pub second_client: ClientSettings,

    /// Maximum concurrent calls per bucket
    pub concurrency: usize,

    /// Headers excluded from mismatch detection
    pub ignored_headers: IgnoredHeaders,

    /// Report format
    pub format: OutputFormat,

    /// Report destination
    pub output: OutputTarget,

    /// Show progress on stderr
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl CompareConfig {
    /// Create and validate configuration from CLI arguments and the process environment
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        Self::from_args_with_env(args, |name| std::env::var(name).ok())
    }

    /// Create and validate configuration with an explicit environment lookup
    pub fn from_args_with_env<F>(args: CliArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = S3Url::parse(&args.first)?;
        let second = S3Url::parse(&args.second)?;

        if args.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                value: args.concurrency,
            });
        }

        let first_client = ClientSettings::resolve(&args, 1, &env)?;
        let second_client = ClientSettings::resolve(&args, 2, &env)?;

        let output = match args.output {
            None => OutputTarget::Stdout,
            Some(path) if path.as_os_str() == "-" => OutputTarget::Stdout,
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        return Err(ConfigError::InvalidOutputPath {
                            reason: format!("Parent directory '{}' does not exist", parent.display()),
                            path,
                        });
                    }
                }
                OutputTarget::File(path)
            }
        };

        Ok(Self {
            first,
            second,
            first_client,
            second_client,
            concurrency: args.concurrency,
            ignored_headers: args.ignore_headers.iter().collect(),
            format: args.format,
            output,
            show_progress: args.progress,
            verbose: args.verbose,
        })
    }
}
