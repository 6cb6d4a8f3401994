/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Protocol core of a CardDAV server.
//!
//! Turns request paths into typed node references, evaluates address-book
//! filters, runs the `addressbook-query` and `addressbook-multiget`
//! reports and enforces the conditional-request and access contracts
//! around mutation. Storage, ACL evaluation, vCard text handling and XML
//! (de)serialization live behind collaborator boundaries.

pub mod card;
pub mod collection;
pub mod common;
pub mod config;
pub mod delete;
pub mod file;
pub mod get;
pub mod node;
pub mod report;

use crate::config::CardDavConfig;
use dav_proto::schema::response::Condition;
use directory::{
    AccessToken, DirectoryHandler,
    pool::{HandlerKey, HandlerPool, PooledHandler},
};
use hyper::StatusCode;

pub type Result<T> = std::result::Result<T, DavError>;

#[derive(Debug)]
pub enum DavError {
    Code(StatusCode),
    Condition(DavErrorCondition),
    Directory(directory::Error),
}

#[derive(Debug)]
pub struct DavErrorCondition {
    pub code: StatusCode,
    pub condition: Condition,
    pub details: Option<String>,
}

impl DavErrorCondition {
    pub fn new(code: StatusCode, condition: impl Into<Condition>) -> Self {
        DavErrorCondition {
            code,
            condition: condition.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<DavErrorCondition> for DavError {
    fn from(value: DavErrorCondition) -> Self {
        DavError::Condition(value)
    }
}

impl From<directory::Error> for DavError {
    fn from(value: directory::Error) -> Self {
        DavError::Directory(value)
    }
}

impl DavError {
    pub fn status(&self) -> StatusCode {
        match self {
            DavError::Code(code) => *code,
            DavError::Condition(condition) => condition.code,
            DavError::Directory(err) => match err {
                directory::Error::NotFound => StatusCode::NOT_FOUND,
                directory::Error::NoAccess => StatusCode::FORBIDDEN,
                directory::Error::Duplicate => StatusCode::FORBIDDEN,
                directory::Error::DuplicateUid(_) | directory::Error::ChangeUid => {
                    StatusCode::CONFLICT
                }
                directory::Error::DestinationExists => StatusCode::PRECONDITION_FAILED,
                directory::Error::Illegal(_) => StatusCode::BAD_REQUEST,
                directory::Error::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// The request-handling core. The hosting process builds the backend
/// factory once at startup and threads the server through every request.
pub struct Server<D: DirectoryHandler> {
    pub config: CardDavConfig,
    pool: HandlerPool<D>,
}

impl<D: DirectoryHandler> Server<D> {
    pub fn new(
        config: CardDavConfig,
        make: impl Fn(&HandlerKey) -> directory::Result<D> + Send + Sync + 'static,
    ) -> Self {
        Server {
            config,
            pool: HandlerPool::new(make),
        }
    }

    /// Check out the directory handler responsible for `uri`, opened for
    /// the request's account. The handler is returned to the pool when the
    /// guard drops.
    pub fn directory(
        &self,
        uri: &str,
        access_token: &AccessToken,
    ) -> Result<PooledHandler<'_, D>> {
        let prefix = self.config.handler_prefix(uri);
        self.pool
            .checkout(prefix, access_token.account.as_deref())
            .map_err(DavError::from)
    }
}
