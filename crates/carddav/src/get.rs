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
use directory::{AccessToken, DirectoryHandler, acl::Privilege, query::GetLimits};
use hyper::StatusCode;

/// Content of a single-resource fetch. Rendering (HTML listings, JSON
/// variants) happens outside the core.
#[derive(Debug)]
pub enum Content {
    Card {
        data: String,
        content_type: &'static str,
    },
    File {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    Collection {
        nodes: Vec<DavNode>,
    },
}

pub trait GetRequestHandler<D: DirectoryHandler> {
    fn handle_get_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
    ) -> impl Future<Output = crate::Result<Content>> + Send;
}

impl<D: DirectoryHandler> GetRequestHandler<D> for Server<D> {
    async fn handle_get_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
    ) -> crate::Result<Content> {
        let directory = self.directory(headers.uri, access_token)?;

        let node = self
            .resolve_uri(&directory, headers.uri, Resolve::Must, NodeType::Unknown)
            .await?;

        match node {
            DavNode::Card {
                collection, card, ..
            } => {
                // Validate ACL
                if !self
                    .validate_access(&directory, &collection, Privilege::Read, true)
                    .await?
                    .allowed
                {
                    return Err(DavError::Code(StatusCode::FORBIDDEN));
                }

                let card = card.ok_or(DavError::Code(StatusCode::NOT_FOUND))?;
                Ok(Content::Card {
                    data: card.vcard.to_string(),
                    content_type: "text/vcard",
                })
            }
            DavNode::File {
                collection,
                mut file,
                ..
            } => {
                if !self
                    .validate_access(&directory, &collection, Privilege::Read, true)
                    .await?
                    .allowed
                {
                    return Err(DavError::Code(StatusCode::FORBIDDEN));
                }

                // Content is loaded lazily.
                let bytes = match file.content.take() {
                    Some(bytes) => bytes,
                    None => directory.file_content(&file).await?,
                };
                Ok(Content::File {
                    bytes,
                    content_type: file.content_type,
                })
            }
            DavNode::Collection { collection, .. } => {
                if self.config.directory_browsing_disallowed {
                    return Err(DavError::Code(StatusCode::FORBIDDEN));
                }

                let nodes = if collection.address_book {
                    directory
                        .cards(&collection, None, &GetLimits::default())
                        .await?
                        .entries
                        .into_iter()
                        .map(|card| {
                            let name = card
                                .name
                                .clone()
                                .unwrap_or_else(|| {
                                    crate::card::default_card_name(
                                        card.uid().unwrap_or_default(),
                                    )
                                });
                            DavNode::Card {
                                collection: collection.clone(),
                                card: Some(card),
                                name,
                                exists: true,
                            }
                        })
                        .collect()
                } else {
                    directory
                        .collections(&collection.path, &GetLimits::default())
                        .await?
                        .entries
                        .into_iter()
                        .map(|child| DavNode::Collection {
                            collection: child,
                            parent: None,
                            exists: true,
                        })
                        .collect()
                };

                Ok(Content::Collection { nodes })
            }
            DavNode::Principal { .. } | DavNode::Error { .. } => {
                Err(DavError::Code(StatusCode::METHOD_NOT_ALLOWED))
            }
        }
    }
}
