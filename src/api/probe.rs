//! Purpose: Decide whether the managed service answers its REST API.
//! Exports: `is_reachable`.
//! Invariants: One unfiltered schedule listing per probe; a single failure is definitive.
use tracing::debug;

use super::remote::RepairScheduler;
use super::result::RemoteResult;

pub fn is_reachable(api: &dyn RepairScheduler) -> bool {
    match api.list_schedules(None, None) {
        RemoteResult::Success(_) => true,
        RemoteResult::Failure(cause) => {
            debug!(%cause, "liveness probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_reachable;
    use crate::api::RemoteClient;
    use std::net::TcpListener;

    #[test]
    fn refused_endpoint_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        drop(listener);
        let client = RemoteClient::new(base_url).expect("client");
        assert!(!is_reachable(&client));
    }
}
