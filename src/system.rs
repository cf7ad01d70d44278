use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Blocks until previously written data reaches stable storage, returning
/// how long the flush took so the orchestrator can fold it into the write
/// phase timing.
pub fn flush_to_stable_storage() -> Duration {
	let start = Instant::now();
	rustix::fs::sync();
	start.elapsed()
}

/// Asks the kernel to drop the page cache so the read phase measures the
/// storage device rather than writer-side memory. Needs root; without the
/// privilege this is a silent skip, not an error. Returns whether the drop
/// actually happened.
#[cfg(target_os = "linux")]
pub fn drop_page_cache() -> bool {
	match std::fs::write("/proc/sys/vm/drop_caches", "3") {
		Ok(()) => {
			debug!("dropped kernel page cache");
			true
		}
		Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
			debug!("not privileged to drop page cache, skipping");
			false
		}
		Err(e) => {
			warn!(error = %e, "failed to drop page cache");
			false
		}
	}
}

#[cfg(not(target_os = "linux"))]
pub fn drop_page_cache() -> bool {
	debug!("page cache drop not supported on this platform, skipping");
	false
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flush_reports_a_duration() {
		// sync(2) always succeeds; only the timing contract is observable
		let took = flush_to_stable_storage();
		assert!(took < Duration::from_secs(600));
	}

	#[test]
	fn cache_drop_never_panics_unprivileged() {
		let _ = drop_page_cache();
	}
}
