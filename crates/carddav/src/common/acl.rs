/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{DavError, Server, node::DavNode};
use directory::{
    DirectoryHandler,
    acl::{CurrentAccess, Privilege},
    collection::Collection,
};

pub trait DavAclHandler<D: DirectoryHandler> {
    /// Pass-through to the ACL collaborator. With `return_result` unset a
    /// denial surfaces as Forbidden from the collaborator itself.
    fn validate_access(
        &self,
        directory: &D,
        collection: &Collection,
        privilege: Privilege,
        return_result: bool,
    ) -> impl Future<Output = crate::Result<CurrentAccess>> + Send;

    /// PUT pre-check: bind privilege on the owning collection.
    fn can_put(
        &self,
        directory: &D,
        node: &DavNode,
    ) -> impl Future<Output = crate::Result<bool>> + Send;
}

impl<D: DirectoryHandler> DavAclHandler<D> for Server<D> {
    async fn validate_access(
        &self,
        directory: &D,
        collection: &Collection,
        privilege: Privilege,
        return_result: bool,
    ) -> crate::Result<CurrentAccess> {
        directory
            .check_access(collection, privilege, return_result)
            .await
            .map_err(DavError::from)
    }

    async fn can_put(&self, directory: &D, node: &DavNode) -> crate::Result<bool> {
        match node {
            DavNode::Card { collection, .. } | DavNode::File { collection, .. } => Ok(self
                .validate_access(directory, collection, Privilege::Bind, true)
                .await?
                .allowed),
            _ => Ok(false),
        }
    }
}
