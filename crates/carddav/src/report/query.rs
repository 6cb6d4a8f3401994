/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    DavError, Server,
    card::default_card_name,
    common::uri::{DavUriResource, NodeType, Precomputed, Resolve},
    node::DavNode,
    report::{QueryResult, ReportResult, default_depth},
};
use dav_proto::{
    RequestHeaders,
    schema::request::{AddressbookQuery, Filter},
};
use directory::{
    AccessToken, DirectoryHandler, collection::Collection, query::GetLimits,
};
use hyper::StatusCode;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

pub(crate) trait AddressbookQueryRequestHandler<D: DirectoryHandler> {
    fn handle_addressbook_query(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: AddressbookQuery,
        cancel: &CancellationToken,
    ) -> impl Future<Output = crate::Result<ReportResult>> + Send;
}

impl<D: DirectoryHandler> AddressbookQueryRequestHandler<D> for Server<D> {
    async fn handle_addressbook_query(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: AddressbookQuery,
        cancel: &CancellationToken,
    ) -> crate::Result<ReportResult> {
        let directory = self.directory(headers.uri, access_token)?;

        let root = self
            .resolve_uri(&directory, headers.uri, Resolve::Must, NodeType::Unknown)
            .await?;

        let limits = GetLimits {
            limit: request.limit.map(|limit| limit as usize),
        };
        let max_depth = default_depth(headers.depth);

        let result = self
            .query_node_and_children(
                &directory,
                root,
                0,
                max_depth,
                &request.filter,
                &limits,
                cancel,
            )
            .await?;

        tracing::debug!(
            nodes = result.nodes.len(),
            over_limit = result.over_limit,
            server_truncated = result.server_truncated,
            "addressbook-query complete"
        );

        Ok(ReportResult {
            // A truncated result is reported on the root, the collected
            // nodes are kept.
            root_status: result
                .truncated()
                .then_some(StatusCode::INSUFFICIENT_STORAGE),
            nodes: result.nodes,
        })
    }
}

pub(crate) trait QueryTraversal<D: DirectoryHandler> {
    fn query_node_and_children<'x>(
        &'x self,
        directory: &'x D,
        node: DavNode,
        cur_depth: usize,
        max_depth: usize,
        filter: &'x Filter,
        limits: &'x GetLimits,
        cancel: &'x CancellationToken,
    ) -> Pin<Box<dyn Future<Output = crate::Result<QueryResult>> + Send + 'x>>;
}

impl<D: DirectoryHandler> QueryTraversal<D> for Server<D> {
    /// Depth-first, left-to-right traversal with fail-fast aggregation:
    /// once the running count exceeds the client limit, or a branch reports
    /// a server cap, collected nodes are kept and remaining siblings are
    /// skipped.
    fn query_node_and_children<'x>(
        &'x self,
        directory: &'x D,
        node: DavNode,
        cur_depth: usize,
        max_depth: usize,
        filter: &'x Filter,
        limits: &'x GetLimits,
        cancel: &'x CancellationToken,
    ) -> Pin<Box<dyn Future<Output = crate::Result<QueryResult>> + Send + 'x>> {
        Box::pin(async move {
            match node {
                // Targeted directly at a card: returned as-is, without
                // re-evaluating the filter.
                node @ DavNode::Card { .. } => Ok(QueryResult {
                    nodes: vec![node],
                    ..Default::default()
                }),
                DavNode::Collection { collection, .. } if collection.address_book => {
                    self.query_address_book(directory, collection, filter, limits)
                        .await
                }
                DavNode::Collection { collection, .. } => {
                    let cur_depth = cur_depth + 1;
                    let mut result = QueryResult::default();

                    if cur_depth > max_depth {
                        return Ok(result);
                    }

                    let children = directory
                        .collections(&collection.path, &GetLimits::default())
                        .await?;

                    for child in children.entries {
                        if cancel.is_cancelled() {
                            tracing::debug!(
                                collection = collection.path.as_str(),
                                "traversal cancelled"
                            );
                            break;
                        }

                        if limits
                            .limit
                            .is_some_and(|limit| result.nodes.len() > limit)
                        {
                            result.over_limit = true;
                            break;
                        }

                        let child_node = DavNode::Collection {
                            collection: child,
                            parent: None,
                            exists: true,
                        };
                        let sub = self
                            .query_node_and_children(
                                directory, child_node, cur_depth, max_depth, filter,
                                limits, cancel,
                            )
                            .await?;

                        result.nodes.extend(sub.nodes);

                        if sub.over_limit {
                            result.over_limit = true;
                            break;
                        }
                        if sub.server_truncated {
                            result.server_truncated = true;
                            break;
                        }
                    }

                    Ok(result)
                }
                DavNode::File { .. } | DavNode::Principal { .. } | DavNode::Error { .. } => {
                    Err(DavError::Code(StatusCode::BAD_REQUEST))
                }
            }
        })
    }
}

impl<D: DirectoryHandler> Server<D> {
    /// Backend search over one address book; each returned card becomes a
    /// card reference under that collection.
    async fn query_address_book(
        &self,
        directory: &D,
        collection: Collection,
        filter: &Filter,
        limits: &GetLimits,
    ) -> crate::Result<QueryResult> {
        let filter = (!filter.is_empty()).then_some(filter);
        let found = directory.cards(&collection, filter, limits).await?;

        tracing::debug!(
            collection = collection.path.as_str(),
            cards = found.entries.len(),
            "address book query"
        );

        let mut result = QueryResult {
            over_limit: found.over_limit,
            server_truncated: found.server_truncated,
            ..Default::default()
        };

        for mut card in found.entries {
            card.capture_prev();
            // Cards without an assigned name fall back to their uid.
            let name = card
                .name
                .clone()
                .unwrap_or_else(|| default_card_name(card.uid().unwrap_or_default()));
            card.name = Some(name.clone());

            let href = format!("{}{}", collection.path, name);
            let node = self
                .resolve_uri(
                    directory,
                    &href,
                    Resolve::AlreadyResolved(Precomputed::Card {
                        collection: collection.clone(),
                        card,
                    }),
                    NodeType::Entity,
                )
                .await?;
            result.nodes.push(node);
        }

        Ok(result)
    }
}
