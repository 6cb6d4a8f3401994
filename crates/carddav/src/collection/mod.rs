/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    DavError, DavErrorCondition, Server,
    common::{
        acl::DavAclHandler,
        uri::{DavUriResource, NodeType, Resolve},
    },
    node::DavNode,
};
use dav_proto::{
    Depth, RequestHeaders,
    schema::{request::MkCol, response::CardCondition},
};
use directory::{
    AccessToken, DirectoryHandler, MkColStatus, acl::Privilege,
};
use hyper::StatusCode;

pub trait MkColRequestHandler<D: DirectoryHandler> {
    fn handle_mkcol_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: MkCol,
    ) -> impl Future<Output = crate::Result<StatusCode>> + Send;
}

impl<D: DirectoryHandler> MkColRequestHandler<D> for Server<D> {
    async fn handle_mkcol_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: MkCol,
    ) -> crate::Result<StatusCode> {
        let directory = self.directory(headers.uri, access_token)?;

        // Validate URI: the target must not exist, its parent must.
        let node = self
            .resolve_uri(
                &directory,
                headers.uri,
                Resolve::MustNot,
                NodeType::Collection,
            )
            .await?;
        let DavNode::Collection {
            mut collection,
            parent: Some(parent),
            ..
        } = node
        else {
            return Err(DavError::Code(StatusCode::CONFLICT));
        };

        // Address books are leaves; no collection may nest under one.
        if parent.address_book {
            return Err(DavErrorCondition::new(
                StatusCode::FORBIDDEN,
                CardCondition::AddressbookCollectionLocationOk,
            )
            .into());
        }

        if collection.name.is_empty() {
            return Err(DavError::Code(StatusCode::FORBIDDEN));
        }

        // Validate ACL
        if !self
            .validate_access(&directory, &parent, Privilege::Bind, true)
            .await?
            .allowed
        {
            return Err(DavError::Code(StatusCode::FORBIDDEN));
        }

        collection.address_book = request.is_addressbook;
        if let Some(display_name) = request.display_name {
            collection.name = display_name;
        }
        collection.description = request.description;

        tracing::debug!(
            path = collection.path.as_str(),
            address_book = collection.address_book,
            "make collection"
        );

        match directory.make_collection(&collection, &parent.path).await? {
            MkColStatus::Created => Ok(StatusCode::CREATED),
            MkColStatus::AlreadyExists => Err(DavError::Code(StatusCode::FORBIDDEN)),
        }
    }
}

pub trait CopyMoveRequestHandler<D: DirectoryHandler> {
    /// COPY and MOVE over collections, cards and binary resources; reports
    /// whether the destination was created or replaced.
    fn handle_copy_move_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        copy: bool,
    ) -> impl Future<Output = crate::Result<StatusCode>> + Send;
}

impl<D: DirectoryHandler> CopyMoveRequestHandler<D> for Server<D> {
    async fn handle_copy_move_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        copy: bool,
    ) -> crate::Result<StatusCode> {
        let directory = self.directory(headers.uri, access_token)?;

        let destination = headers
            .destination
            .ok_or(DavError::Code(StatusCode::BAD_REQUEST))?;

        let from = self
            .resolve_uri(&directory, headers.uri, Resolve::Must, NodeType::Unknown)
            .await?;

        match &from {
            DavNode::Collection { collection, .. } => {
                // Folder copies are all-or-nothing.
                if !matches!(headers.depth, Depth::None | Depth::Infinity) {
                    return Err(DavError::Code(StatusCode::BAD_REQUEST));
                }

                let to = self
                    .resolve_uri(&directory, destination, Resolve::May, NodeType::Collection)
                    .await?;
                if to.exists() && !headers.overwrite {
                    return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
                }

                let created = directory
                    .copy_move_collection(collection, &to.href(), copy, headers.overwrite)
                    .await?;
                Ok(copy_move_status(created))
            }
            DavNode::Card { card, .. } => {
                if !matches!(headers.depth, Depth::None | Depth::Zero) {
                    return Err(DavError::Code(StatusCode::BAD_REQUEST));
                }

                let card = card
                    .as_ref()
                    .ok_or(DavError::Code(StatusCode::NOT_FOUND))?;
                let to = self
                    .resolve_uri(&directory, destination, Resolve::May, NodeType::Entity)
                    .await?;
                let DavNode::Card {
                    collection: to_collection,
                    name: to_name,
                    exists: to_exists,
                    ..
                } = &to
                else {
                    return Err(DavError::Code(StatusCode::BAD_REQUEST));
                };

                if *to_exists && !headers.overwrite {
                    return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
                }

                let created = directory
                    .copy_move_card(card, &to_collection.path, to_name, copy, headers.overwrite)
                    .await?;
                Ok(copy_move_status(created))
            }
            DavNode::File { file, .. } => {
                if !matches!(headers.depth, Depth::None | Depth::Zero) {
                    return Err(DavError::Code(StatusCode::BAD_REQUEST));
                }

                let to = self
                    .resolve_uri(&directory, destination, Resolve::May, NodeType::Entity)
                    .await?;
                let DavNode::File {
                    collection: to_collection,
                    file: to_file,
                    exists: to_exists,
                } = &to
                else {
                    return Err(DavError::Code(StatusCode::BAD_REQUEST));
                };

                if *to_exists && !headers.overwrite {
                    return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
                }

                let created = directory
                    .copy_move_file(
                        file,
                        &to_collection.path,
                        &to_file.name,
                        copy,
                        headers.overwrite,
                    )
                    .await?;
                Ok(copy_move_status(created))
            }
            DavNode::Principal { .. } | DavNode::Error { .. } => {
                Err(DavError::Code(StatusCode::BAD_REQUEST))
            }
        }
    }
}

fn copy_move_status(created: bool) -> StatusCode {
    if created {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    }
}
