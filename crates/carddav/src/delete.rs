/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    DavError, Server,
    common::{
        acl::DavAclHandler,
        uri::{DavUriResource, NodeType, Resolve},
    },
    node::DavNode,
};
use dav_proto::RequestHeaders;
use directory::{AccessToken, DirectoryHandler, acl::Privilege};
use hyper::StatusCode;

pub trait DeleteRequestHandler<D: DirectoryHandler> {
    fn handle_delete_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
    ) -> impl Future<Output = crate::Result<()>> + Send;
}

impl<D: DirectoryHandler> DeleteRequestHandler<D> for Server<D> {
    async fn handle_delete_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
    ) -> crate::Result<()> {
        let directory = self.directory(headers.uri, access_token)?;

        // Validate URI
        let node = self
            .resolve_uri(&directory, headers.uri, Resolve::Must, NodeType::Unknown)
            .await?;

        // Validate headers
        if let Some(if_etag) = &headers.if_headers.if_etag {
            if node.etag(true).as_deref() != Some(if_etag.as_str()) {
                return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
            }
        }

        tracing::debug!(uri = node.href().as_str(), "delete");

        match &node {
            DavNode::Card {
                collection, name, ..
            } => {
                // Validate ACL
                if !self
                    .validate_access(&directory, collection, Privilege::Unbind, true)
                    .await?
                    .allowed
                {
                    return Err(DavError::Code(StatusCode::FORBIDDEN));
                }

                directory.delete_card(&collection.path, name).await?;
            }
            DavNode::File {
                collection, file, ..
            } => {
                if !self
                    .validate_access(&directory, collection, Privilege::Unbind, true)
                    .await?
                    .allowed
                {
                    return Err(DavError::Code(StatusCode::FORBIDDEN));
                }

                directory.delete_file(collection, &file.name).await?;
            }
            DavNode::Collection { collection, .. } => {
                directory.delete_collection(collection).await?;
            }
            DavNode::Principal { .. } | DavNode::Error { .. } => {
                return Err(DavError::Code(StatusCode::FORBIDDEN));
            }
        }

        Ok(())
    }
}
