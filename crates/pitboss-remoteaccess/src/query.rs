use std::sync::Arc;

use pitboss_core::{ActorType, Clock};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::requests::{ListRemoteAccessActivitiesRequest, ListRemoteAccessActivitiesResponse};
use crate::store::RemoteAccessStore;

/// `ListRemoteAccessActivities` (§6). Under fail-closed mode this surfaces
/// ERROR rather than silently falling back to the mirror when persistence
/// is unavailable (§9).
pub async fn list_remote_access_activities(
    store: &RemoteAccessStore,
    clock: &Arc<dyn Clock>,
    fail_closed: bool,
    req: ListRemoteAccessActivitiesRequest,
) -> ListRemoteAccessActivitiesResponse {
    let now = clock.now();

    let result = async {
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;
        store.list(req.page_size, req.offset, fail_closed).await
    }
    .await;

    match result {
        Ok(activities) => {
            let count = activities.len() as i64;
            ListRemoteAccessActivitiesResponse { meta: meta_ok(&req.meta.request_id, now), activities, next_offset: req.offset + count }
        }
        Err(e) => ListRemoteAccessActivitiesResponse { meta: meta_from_error(&req.meta.request_id, now, &e), activities: vec![], next_offset: req.offset },
    }
}
