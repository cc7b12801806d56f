// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Result;
use crate::authorizer::Authorize;
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Holds the current [Session] and replaces it when it is rejected.
///
/// Callers take a snapshot (an `Arc<Session>`) and use it for one request. The
/// cache never mutates a session in place, a refresh swaps in a brand new
/// `Arc<Session>`, so readers always observe a complete session.
///
/// Refreshes are coalesced: when many concurrent requests discover the same
/// stale session, only one of them calls the authorizer and the rest reuse its
/// result.
#[derive(Clone, Debug)]
pub struct SessionCache {
    // The current session, `None` until the first successful authorization.
    session: Arc<RwLock<Option<Arc<Session>>>>,

    // Held while a call to the authorizer is in progress.
    refresh_in_progress: Arc<Mutex<()>>,

    // The authorizer. This thing does the refreshing.
    inner: Arc<dyn Authorize>,
}

impl SessionCache {
    pub fn new<A: Authorize + 'static>(inner: A) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            refresh_in_progress: Arc::new(Mutex::new(())),
            inner: Arc::new(inner),
        }
    }

    /// Returns the current session, authorizing the account if needed.
    ///
    /// Failed authorizations are not cached, the next call tries again.
    pub async fn session(&self) -> Result<Arc<Session>> {
        if let Some(current) = self.current().await {
            return Ok(current);
        }
        let _guard = self.refresh_in_progress.lock().await;
        // Another task may have completed the authorization while we waited.
        if let Some(current) = self.current().await {
            return Ok(current);
        }
        self.authorize().await
    }

    /// Replaces `stale` with a freshly authorized session.
    ///
    /// If the current session is no longer `stale` some other task already
    /// refreshed it, and this function returns the newer session without
    /// calling the authorizer.
    pub async fn refresh(&self, stale: &Arc<Session>) -> Result<Arc<Session>> {
        let _guard = self.refresh_in_progress.lock().await;
        if let Some(current) = self.current().await {
            if !Arc::ptr_eq(&current, stale) {
                return Ok(current);
            }
        }
        tracing::info!(
            account_id = %stale.account_id,
            "the session token was rejected, authorizing the account again"
        );
        self.authorize().await
    }

    /// Returns the current session, if any, without authorizing.
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }

    // Must be called with `refresh_in_progress` held.
    async fn authorize(&self) -> Result<Arc<Session>> {
        let session = Arc::new(self.inner.authorize().await?);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }
}
