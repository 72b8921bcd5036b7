use crate::error::ThresherError;
use std::time::Duration;

const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Retry `op` until it succeeds, fails non-transiently, or the attempt budget
/// runs out. `tries` is the total number of attempts; 0 disables retry (one
/// attempt is still made). Each transient failure is reported and followed by
/// a short fixed delay.
pub fn retry_with<T, F, P>(
    tries: usize,
    name: &str,
    mut is_transient: P,
    mut op: F,
) -> Result<T, ThresherError>
where
    F: FnMut() -> Result<T, ThresherError>,
    P: FnMut(&ThresherError) -> bool,
{
    let budget = tries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) && attempt < budget => {
                tracing::warn!(name, attempt, budget, error = %err, "retrying after transient failure");
                std::thread::sleep(RETRY_DELAY);
            }
            Err(err) => return Err(err),
        }
    }
}

/// `retry_with` specialized to the crate's transient class (`NotReady`),
/// which is what every blocking receive uses.
pub fn retry<T, F>(tries: usize, name: &str, op: F) -> Result<T, ThresherError>
where
    F: FnMut() -> Result<T, ThresherError>,
{
    retry_with(tries, name, ThresherError::is_transient, op)
}
