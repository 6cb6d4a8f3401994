/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Backend boundary of the CardDAV core.
//!
//! A [`DirectoryHandler`] bridges the protocol engine to one portion of the
//! directory tree, selected by path prefix. Handlers are pooled across
//! requests per `(prefix, account)` and checked out for exclusive use by a
//! single request at a time.

pub mod acl;
pub mod card;
pub mod collection;
pub mod file;
pub mod pool;
pub mod principal;
pub mod query;

use crate::{
    acl::{CurrentAccess, Privilege},
    card::Card,
    collection::Collection,
    file::FileResource,
    principal::Principal,
    query::{GetLimits, GetResult},
};
use dav_proto::schema::request::Filter;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("entity not found")]
    NotFound,
    #[error("access denied")]
    NoAccess,
    #[error("duplicate entity")]
    Duplicate,
    #[error("duplicate uid {0}")]
    DuplicateUid(String),
    #[error("cannot change uid")]
    ChangeUid,
    #[error("destination already exists")]
    DestinationExists,
    #[error("illegal operation: {0}")]
    Illegal(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MkColStatus {
    Created,
    AlreadyExists,
}

/// Identity the request is executed for. `account` is `None` for anonymous
/// access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessToken {
    pub account: Option<String>,
}

impl AccessToken {
    pub fn anonymous() -> Self {
        AccessToken::default()
    }

    pub fn for_account(account: impl Into<String>) -> Self {
        AccessToken {
            account: Some(account.into()),
        }
    }
}

/// Interface between the protocol core and a portion of the directory
/// structure.
///
/// Paths are normalized, rooted at the handler's prefix; collection paths
/// end with `/`. Lookup methods return `None` for missing entities, errors
/// are reserved for failures. `open`/`close` bracket one request; all data
/// operations suspend on the backend.
pub trait DirectoryHandler: Send + Sync {
    fn open(&self, account: Option<&str>) -> Result<()>;

    fn close(&self);

    /// Does the path fall within the principal hierarchy?
    fn is_principal(&self, path: &str) -> bool;

    fn principal(&self, path: &str) -> impl Future<Output = Result<Option<Principal>>> + Send;

    /// Home collection path for the given principal.
    fn principal_home(
        &self,
        principal: &Principal,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    fn collection(&self, path: &str) -> impl Future<Output = Result<Option<Collection>>> + Send;

    /// Children of `parent` the current account has access to.
    fn collections(
        &self,
        parent: &str,
        limits: &GetLimits,
    ) -> impl Future<Output = Result<GetResult<Collection>>> + Send;

    fn make_collection(
        &self,
        collection: &Collection,
        parent_path: &str,
    ) -> impl Future<Output = Result<MkColStatus>> + Send;

    fn delete_collection(
        &self,
        collection: &Collection,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns `true` if the destination was created rather than replaced.
    fn copy_move_collection(
        &self,
        from: &Collection,
        to_path: &str,
        copy: bool,
        overwrite: bool,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn card(
        &self,
        collection_path: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Card>>> + Send;

    /// Backend search over one address book. The filter, when given, is
    /// evaluated (or translated) by the backend; `limits` bounds the result
    /// and is reported back through the [`GetResult`] flags.
    fn cards(
        &self,
        collection: &Collection,
        filter: Option<&Filter>,
        limits: &GetLimits,
    ) -> impl Future<Output = Result<GetResult<Card>>> + Send;

    fn add_card(
        &self,
        collection_path: &str,
        card: &Card,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_card(
        &self,
        collection_path: &str,
        card: &Card,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_card(
        &self,
        collection_path: &str,
        name: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn copy_move_card(
        &self,
        from: &Card,
        to_path: &str,
        name: &str,
        copy: bool,
        overwrite: bool,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn file(
        &self,
        collection: &Collection,
        name: &str,
    ) -> impl Future<Output = Result<Option<FileResource>>> + Send;

    /// Fetch the byte content of a resource whose metadata was loaded
    /// without it.
    fn file_content(&self, file: &FileResource) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn put_file(
        &self,
        collection: &Collection,
        file: &FileResource,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_file(&self, file: &FileResource) -> impl Future<Output = Result<()>> + Send;

    fn delete_file(
        &self,
        collection: &Collection,
        name: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn copy_move_file(
        &self,
        from: &FileResource,
        to_path: &str,
        name: &str,
        copy: bool,
        overwrite: bool,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Evaluate `privilege` for the current account on `collection`.
    ///
    /// With `return_result` set the outcome is always reported through
    /// [`CurrentAccess`]; otherwise a denial is signalled as
    /// [`Error::NoAccess`].
    fn check_access(
        &self,
        collection: &Collection,
        privilege: Privilege,
        return_result: bool,
    ) -> impl Future<Output = Result<CurrentAccess>> + Send;
}
