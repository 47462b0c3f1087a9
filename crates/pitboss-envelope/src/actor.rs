use pitboss_core::{Actor, ActorType, PlatformError};

/// Resolves the canonical actor for a request per §4.1:
///
/// - A context actor (injected by authentication middleware upstream) always
///   wins; if the request also carries `meta.actor` the two must match
///   exactly or the call is DENIED.
/// - With no context actor, `meta.actor` is used; missing/invalid/UNSPECIFIED
///   is DENIED.
pub fn resolve_actor(
    context_actor: Option<&Actor>,
    meta_actor: Option<&Actor>,
) -> Result<Actor, PlatformError> {
    match (context_actor, meta_actor) {
        (Some(ctx), Some(meta)) => {
            if ctx == meta {
                Ok(ctx.clone())
            } else {
                Err(PlatformError::denied("actor mismatch with token"))
            }
        }
        (Some(ctx), None) => Ok(ctx.clone()),
        (None, Some(meta)) => {
            if meta.is_authorizable() {
                Ok(meta.clone())
            } else {
                Err(PlatformError::denied("actor is required"))
            }
        }
        (None, None) => Err(PlatformError::denied("actor binding is required")),
    }
}

/// Enforces that the resolved actor's type is one of the operation's allowed
/// kinds. Callers needing the finer-grained "player actor must match
/// account id" rule perform that check separately (it is business-specific,
/// not part of the generic envelope).
pub fn require_actor_type(actor: &Actor, allowed: &[ActorType]) -> Result<(), PlatformError> {
    if allowed.contains(&actor.actor_type) {
        Ok(())
    } else {
        Err(PlatformError::denied("unauthorized actor type"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str, t: ActorType) -> Actor {
        Actor { id: id.to_string(), actor_type: t }
    }

    #[test]
    fn context_actor_wins_when_meta_absent() {
        let ctx = actor("op-1", ActorType::Operator);
        let resolved = resolve_actor(Some(&ctx), None).unwrap();
        assert_eq!(resolved, ctx);
    }

    #[test]
    fn mismatched_context_and_meta_is_denied() {
        let ctx = actor("op-1", ActorType::Operator);
        let meta = actor("op-2", ActorType::Operator);
        let err = resolve_actor(Some(&ctx), Some(&meta)).unwrap_err();
        assert_eq!(err.reason(), "actor mismatch with token");
    }

    #[test]
    fn unspecified_meta_actor_without_context_is_denied() {
        let meta = actor("", ActorType::Unspecified);
        assert!(resolve_actor(None, Some(&meta)).is_err());
    }

    #[test]
    fn no_actor_at_all_is_denied() {
        assert!(resolve_actor(None, None).is_err());
    }

    #[test]
    fn disallowed_actor_type_is_denied() {
        let player = actor("player-1", ActorType::Player);
        assert!(require_actor_type(&player, &[ActorType::Operator, ActorType::Service]).is_err());
        assert!(require_actor_type(&player, &[ActorType::Player]).is_ok());
    }
}
