use serde::Deserialize;
use tracing::{error, info};

use crate::api::VkApi;
use crate::error::CallError;

/// Long-poll position: `ts` is fixed for the session, `pts` moves forward
/// with every successful history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Cursor {
    pub ts: u64,
    pub pts: u64,
}

impl Cursor {
    pub fn new(ts: u64, pts: u64) -> Self {
        Self { ts, pts }
    }

    /// The cursor that follows a successful fetch returning `new_pts`.
    pub fn advance(&self, new_pts: u64) -> Self {
        Self {
            ts: self.ts,
            pts: new_pts,
        }
    }
}

/// Obtain a fresh cursor from `messages.getLongPollServer`.
///
/// API errors are reported here and handed back to the caller, which must
/// not start polling without a cursor.
pub async fn initialize<A>(api: &A) -> Result<Cursor, CallError>
where
    A: VkApi + ?Sized,
{
    match api.get_long_poll_server().await {
        Ok(cursor) => {
            info!("Long-poll session ready: ts={} pts={}", cursor.ts, cursor.pts);
            Ok(cursor)
        }
        Err(CallError::Api(e)) => {
            error!(
                "VK API returned an error while fetching long-poll data: {}: {}",
                e.code, e.message
            );
            Err(CallError::Api(e))
        }
        Err(e) => Err(e),
    }
}
