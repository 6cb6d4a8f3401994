/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    DavError, Server,
    card::update::PutResult,
    common::{
        acl::DavAclHandler,
        uri::{DavUriResource, NodeType, Resolve},
    },
    node::DavNode,
};
use dav_proto::RequestHeaders;
use directory::{AccessToken, DirectoryHandler};
use hyper::StatusCode;

pub trait FileUpdateRequestHandler<D: DirectoryHandler> {
    fn handle_file_update(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        content_type_parts: &[&str],
        bytes: Vec<u8>,
    ) -> impl Future<Output = crate::Result<PutResult>> + Send;
}

impl<D: DirectoryHandler> FileUpdateRequestHandler<D> for Server<D> {
    async fn handle_file_update(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        content_type_parts: &[&str],
        bytes: Vec<u8>,
    ) -> crate::Result<PutResult> {
        let directory = self.directory(headers.uri, access_token)?;

        // Validate URI
        let node = self
            .resolve_uri(&directory, headers.uri, Resolve::May, NodeType::Entity)
            .await?;
        if !matches!(node, DavNode::File { .. }) {
            // A binary PUT aimed at a card.
            return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
        }
        if node.parent().is_some_and(|collection| collection.address_book) {
            return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
        }

        // Validate ACL
        if !self.can_put(&directory, &node).await? {
            return Err(DavError::Code(StatusCode::FORBIDDEN));
        }

        // A missing resource always means create, whatever the If headers
        // say.
        let exists = node.exists();
        let create = headers.if_headers.create || !exists;

        if exists {
            if headers.if_headers.create {
                return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
            }

            if let Some(if_etag) = &headers.if_headers.if_etag {
                let prev_etag = node.prev_etag(true);
                if prev_etag.as_deref() != Some(if_etag.as_str()) {
                    tracing::debug!(
                        if_etag = if_etag.as_str(),
                        prev = prev_etag.as_deref().unwrap_or_default(),
                        "etag mismatch"
                    );
                    return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
                }
            }
        }

        let DavNode::File {
            collection,
            mut file,
            ..
        } = node
        else {
            return Err(DavError::Code(StatusCode::INTERNAL_SERVER_ERROR));
        };

        // Multiple content-type header parts are folded back together.
        let content_type = if content_type_parts.is_empty() {
            None
        } else {
            Some(content_type_parts.join(";"))
        };
        file.set_content(content_type, bytes);

        tracing::debug!(
            collection = collection.path.as_str(),
            name = file.name.as_str(),
            create,
            "put resource"
        );

        if create {
            directory.put_file(&collection, &file).await?;
        } else {
            directory.update_file(&file).await?;
        }

        Ok(PutResult { created: !exists })
    }
}
