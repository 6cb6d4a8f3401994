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
use calcard::{Entry, Parser};
use dav_proto::{
    IfHeaders, RequestHeaders,
    schema::response::CardCondition,
};
use directory::{AccessToken, DirectoryHandler, card::Card};
use hyper::StatusCode;

/// Outcome of a card or resource write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutResult {
    pub created: bool,
}

pub trait CardUpdateRequestHandler<D: DirectoryHandler> {
    fn handle_card_update(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        bytes: Vec<u8>,
    ) -> impl Future<Output = crate::Result<PutResult>> + Send;
}

impl<D: DirectoryHandler> CardUpdateRequestHandler<D> for Server<D> {
    async fn handle_card_update(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        bytes: Vec<u8>,
    ) -> crate::Result<PutResult> {
        let directory = self.directory(headers.uri, access_token)?;

        // Validate URI
        let node = self
            .resolve_uri(&directory, headers.uri, Resolve::May, NodeType::Entity)
            .await?;
        if matches!(node, DavNode::File { .. }) {
            // A card PUT aimed at a binary resource.
            return Err(DavError::Code(StatusCode::PRECONDITION_FAILED));
        }
        let DavNode::Card { collection, .. } = &node else {
            return Err(DavError::Code(StatusCode::METHOD_NOT_ALLOWED));
        };

        // Only vCard payloads are accepted, and only inside address books.
        let vcard_content = headers
            .content_type
            .is_some_and(|ct| ct.split(';').next() == Some("text/vcard"));
        if !collection.address_book || !vcard_content {
            return Err(DavErrorCondition::new(
                StatusCode::FORBIDDEN,
                CardCondition::SupportedAddressData,
            )
            .into());
        }

        if bytes.len() > self.config.max_resource_size {
            return Err(DavErrorCondition::new(
                StatusCode::PRECONDITION_FAILED,
                CardCondition::MaxResourceSize(self.config.max_resource_size as u32),
            )
            .into());
        }

        // Validate ACL
        if !self.can_put(&directory, &node).await? {
            return Err(DavError::Code(StatusCode::FORBIDDEN));
        }

        let raw = std::str::from_utf8(&bytes).map_err(|_| {
            DavError::Condition(
                DavErrorCondition::new(
                    StatusCode::FORBIDDEN,
                    CardCondition::SupportedAddressData,
                )
                .with_details("Invalid UTF-8 in vCard data"),
            )
        })?;

        let vcard = match Parser::new(raw).entry() {
            Entry::VCard(vcard) => vcard,
            _ => {
                return Err(DavError::Condition(
                    DavErrorCondition::new(
                        StatusCode::FORBIDDEN,
                        CardCondition::SupportedAddressData,
                    )
                    .with_details("Failed to parse vCard data"),
                ));
            }
        };

        put_card(&*directory, &node, vcard, &headers.if_headers).await
    }
}

/// Create-or-update with the conditional contract: the target is re-read
/// before deciding, create-only conflicts and name mismatches are rejected,
/// and `If-Match` is compared against the revision captured before any
/// mutation.
async fn put_card<D: DirectoryHandler>(
    directory: &D,
    node: &DavNode,
    vcard: calcard::vcard::VCard,
    if_headers: &IfHeaders,
) -> crate::Result<PutResult> {
    let DavNode::Card {
        collection, name, ..
    } = node
    else {
        return Err(DavError::Code(StatusCode::INTERNAL_SERVER_ERROR));
    };

    tracing::debug!(
        collection = collection.path.as_str(),
        name = name.as_str(),
        "put card"
    );

    let old_card = directory.card(&collection.path, name).await?;
    let card = Card::new(vcard).with_name(name.clone());

    if let Some(old_card) = old_card {
        if if_headers.create {
            // Create demanded but the resource is already there.
            return Err(DavErrorCondition::new(
                StatusCode::PRECONDITION_FAILED,
                CardCondition::NoUidConflict(node.href().into()),
            )
            .with_details("Resource already exists")
            .into());
        }

        if old_card.name.as_deref() != Some(name.as_str()) {
            tracing::debug!(
                expected = name.as_str(),
                stored = old_card.name.as_deref().unwrap_or_default(),
                "mismatched names on update"
            );
            return Err(DavError::Code(StatusCode::BAD_REQUEST));
        }

        if let Some(if_etag) = &if_headers.if_etag {
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

        directory.update_card(&collection.path, &card).await?;
        Ok(PutResult { created: false })
    } else {
        directory.add_card(&collection.path, &card).await?;
        Ok(PutResult { created: true })
    }
}
