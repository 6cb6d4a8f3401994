/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

/// Bounds applied to a collection or search read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetLimits {
    /// Client-requested maximum number of rows.
    pub limit: Option<usize>,
}

impl GetLimits {
    pub fn limited(limit: usize) -> Self {
        GetLimits { limit: Some(limit) }
    }
}

/// Result envelope for every collection/search read.
///
/// `over_limit` reports that the client limit was exceeded,
/// `server_truncated` that a server-imposed hard cap cut the result
/// regardless of any client limit. Both are flags, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult<T> {
    pub entries: Vec<T>,
    pub over_limit: bool,
    pub server_truncated: bool,
}

impl<T> Default for GetResult<T> {
    fn default() -> Self {
        GetResult::empty()
    }
}

impl<T> GetResult<T> {
    pub fn new(entries: Vec<T>) -> Self {
        GetResult {
            entries,
            over_limit: false,
            server_truncated: false,
        }
    }

    pub fn empty() -> Self {
        GetResult::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
