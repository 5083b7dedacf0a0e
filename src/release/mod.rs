//! Release metadata: supported platforms, bucket layout and source revisions.

pub mod paths;
pub mod platforms;
pub mod revision;

pub use paths::{bucket_path_for_release, gcs_url, BuildType};
pub use platforms::{
    arch_list_from_string, join_list, os_list_from_string, PlatformError, PlatformRegistry,
    SupportedPlatforms, WILDCARD,
};
pub use revision::{GitHubRevisionResolver, GitRemoteResolver, RevisionError, RevisionResolver};
