/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod multiget;
pub mod query;

use crate::{
    Server,
    node::DavNode,
    report::{
        multiget::AddressbookMultiGetRequestHandler, query::AddressbookQueryRequestHandler,
    },
};
use dav_proto::{Depth, RequestHeaders, schema::request::Report};
use directory::{AccessToken, DirectoryHandler};
use hyper::StatusCode;
use tokio_util::sync::CancellationToken;

/// Nodes collected by a report plus the truncation flags carried alongside
/// them. Flags are results, never errors.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub nodes: Vec<DavNode>,
    pub over_limit: bool,
    pub server_truncated: bool,
}

impl QueryResult {
    pub fn truncated(&self) -> bool {
        self.over_limit || self.server_truncated
    }
}

/// What the multistatus serializer consumes: one entry per node, plus an
/// optional status on the root when the result was truncated.
#[derive(Debug)]
pub struct ReportResult {
    pub root_status: Option<StatusCode>,
    pub nodes: Vec<DavNode>,
}

pub trait ReportRequestHandler<D: DirectoryHandler> {
    fn handle_report_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: Report,
        cancel: &CancellationToken,
    ) -> impl Future<Output = crate::Result<ReportResult>> + Send;
}

impl<D: DirectoryHandler> ReportRequestHandler<D> for Server<D> {
    async fn handle_report_request(
        &self,
        access_token: &AccessToken,
        headers: &RequestHeaders<'_>,
        request: Report,
        cancel: &CancellationToken,
    ) -> crate::Result<ReportResult> {
        match request {
            Report::AddressbookQuery(request) => {
                self.handle_addressbook_query(access_token, headers, request, cancel)
                    .await
            }
            Report::AddressbookMultiGet(request) => {
                self.handle_addressbook_multiget(access_token, headers, request, cancel)
                    .await
            }
        }
    }
}

/// REPORT affects the root only unless a depth was given.
pub(crate) fn default_depth(depth: Depth) -> usize {
    match depth {
        Depth::One => 1,
        Depth::Infinity => usize::MAX,
        Depth::Zero | Depth::None => 0,
    }
}
