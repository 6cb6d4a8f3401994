/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{DirectoryHandler, Result};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::ops::Deref;

/// Handlers are cached per `(path prefix, account)` to amortize backend
/// connection setup across requests for the same principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    pub prefix: String,
    pub account: Option<String>,
}

/// Cross-request handler cache.
///
/// The map is the only state shared between concurrent requests; it is
/// guarded by a mutex and handlers are created under the lock. A checkout
/// hands exclusive use of one handler to one request; the guard opens the
/// handler for the request's account and closes and returns it on drop, on
/// every exit path.
pub struct HandlerPool<D> {
    make: Box<dyn Fn(&HandlerKey) -> Result<D> + Send + Sync>,
    idle: Mutex<AHashMap<HandlerKey, Vec<D>>>,
}

impl<D: DirectoryHandler> HandlerPool<D> {
    pub fn new(make: impl Fn(&HandlerKey) -> Result<D> + Send + Sync + 'static) -> Self {
        HandlerPool {
            make: Box::new(make),
            idle: Mutex::new(AHashMap::new()),
        }
    }

    pub fn checkout(
        &self,
        prefix: &str,
        account: Option<&str>,
    ) -> Result<PooledHandler<'_, D>> {
        let key = HandlerKey {
            prefix: prefix.to_string(),
            account: account.map(str::to_string),
        };

        let handler = {
            let mut idle = self.idle.lock();
            match idle.get_mut(&key).and_then(Vec::pop) {
                Some(handler) => handler,
                None => {
                    tracing::debug!(prefix = key.prefix.as_str(), "creating directory handler");
                    (self.make)(&key)?
                }
            }
        };

        handler.open(account)?;

        Ok(PooledHandler {
            pool: self,
            key,
            handler: Some(handler),
        })
    }

    fn give_back(&self, key: HandlerKey, handler: D) {
        handler.close();
        self.idle.lock().entry(key).or_default().push(handler);
    }
}

/// Exclusive, request-scoped use of one pooled handler.
pub struct PooledHandler<'x, D: DirectoryHandler> {
    pool: &'x HandlerPool<D>,
    key: HandlerKey,
    handler: Option<D>,
}

impl<D: DirectoryHandler> Deref for PooledHandler<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.handler.as_ref().expect("handler checked out")
    }
}

impl<D: DirectoryHandler> Drop for PooledHandler<'_, D> {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            self.pool.give_back(self.key.clone(), handler);
        }
    }
}
