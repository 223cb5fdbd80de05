//! Glue over the third-party identity widget's storage keys.
//!
//! The SDK writes its session token and event flags straight into durable
//! storage; we only read them. Each flagged event produces at most one
//! notice, after which the flag is cleared.

use crate::notices::{Notice, NoticeKind};
use crate::snapshot::StorageScope;

/// Keys owned by the identity SDK, not by us.
const SESSION_TOKEN_KEY: &str = "DS";
const LEGACY_TOKEN_KEY: &str = "auth-token";
const TOKEN_CREATED_FLAG: &str = "descope_token_created";
const CACHED_USER_ID_KEY: &str = "descope_user_id";

/// The bearer credential for cart requests, if any. Absence is not an
/// error; requests go out without the header and the backend decides.
pub fn session_token<S: StorageScope>(scope: &S) -> Option<String> {
    scope
        .get(SESSION_TOKEN_KEY)
        .or_else(|| scope.get(LEGACY_TOKEN_KEY))
}

/// Run one pass of the session watcher: cache the SDK-exposed user id,
/// surface a one-time notice when the SDK flagged a freshly created auth
/// key, and drop the cached user id once the SDK's own session is gone.
pub fn poll<S: StorageScope>(scope: &S, sdk_user_id: Option<&str>) -> Option<Notice> {
    if let Some(user_id) = sdk_user_id {
        scope.set(CACHED_USER_ID_KEY, user_id);
    }

    if scope.get(SESSION_TOKEN_KEY).is_none() {
        scope.remove(CACHED_USER_ID_KEY);
    }

    if scope.get(TOKEN_CREATED_FLAG).is_some() {
        scope.remove(TOKEN_CREATED_FLAG);
        return Some(Notice {
            kind: NoticeKind::AuthKeyCreated,
            title: "Auth key created".to_string(),
            body: "A new session key was created for this account".to_string(),
        });
    }
    None
}
