//! Blocking wait for a submitted build.

use std::time::Duration;

use super::build::Build;
use super::client::{BuildService, GcbError};

/// Poll `service` every `interval` until the build reaches a terminal status.
///
/// There is no overall timeout; the first error from the service ends the wait.
pub async fn wait_for_build(
    service: &dyn BuildService,
    project: &str,
    id: &str,
    interval: Duration,
) -> Result<Build, GcbError> {
    let mut polls: u64 = 0;
    loop {
        let build = service.get(project, id).await?;
        polls += 1;

        let status = build.status();
        if status.is_terminal() {
            log::debug!("[GCB] Build {} finished with {} after {} polls", id, status, polls);
            return Ok(build);
        }

        log::debug!("[GCB] Build {} is {}, checking again in {:?}", id, status, interval);
        tokio::time::sleep(interval).await;
    }
}
