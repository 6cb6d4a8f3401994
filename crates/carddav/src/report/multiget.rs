/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{
    Server,
    common::uri::{DavUriResource, NodeType, Resolve},
    node::DavNode,
    report::ReportResult,
};
use dav_proto::{RequestHeaders, schema::request::MultiGet};
use directory::{AccessToken, DirectoryHandler};
use tokio_util::sync::CancellationToken;

pub(crate) trait AddressbookMultiGetRequestHandler<D: DirectoryHandler> {
    fn handle_addressbook_multiget(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: MultiGet,
        cancel: &CancellationToken,
    ) -> impl Future<Output = crate::Result<ReportResult>> + Send;
}

impl<D: DirectoryHandler> AddressbookMultiGetRequestHandler<D> for Server<D> {
    /// Every href resolves independently; a failure becomes a typed
    /// placeholder entry instead of aborting the report. Output order and
    /// length match the input.
    async fn handle_addressbook_multiget(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: MultiGet,
        cancel: &CancellationToken,
    ) -> crate::Result<ReportResult> {
        let directory = self.directory(headers.uri, access_token)?;

        let mut nodes = Vec::with_capacity(request.hrefs.len());

        for href in &request.hrefs {
            if cancel.is_cancelled() {
                tracing::debug!("multiget cancelled");
                break;
            }

            match self
                .resolve_uri(&directory, href, Resolve::Must, NodeType::Unknown)
                .await
            {
                Ok(node) => nodes.push(node),
                Err(err) => {
                    let status = err.status();
                    tracing::debug!(
                        href = href.as_str(),
                        status = status.as_u16(),
                        "multiget href failed"
                    );
                    // Best-effort typing: a trailing slash reads as a
                    // collection.
                    nodes.push(DavNode::Error {
                        href: href.clone(),
                        status,
                        collection: href.ends_with('/'),
                    });
                }
            }
        }

        Ok(ReportResult {
            root_status: None,
            nodes,
        })
    }
}
