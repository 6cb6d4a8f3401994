/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod acl;
pub mod uri;

use directory::{card::Card, collection::Collection, file::FileResource};

/// Strong entity tag of the current revision.
pub trait ETag {
    fn etag(&self) -> String;
}

impl ETag for Card {
    fn etag(&self) -> String {
        format!("\"{}\"", self.modified)
    }
}

impl ETag for Collection {
    fn etag(&self) -> String {
        format!("\"{}\"", self.modified)
    }
}

impl ETag for FileResource {
    fn etag(&self) -> String {
        format!("\"{}-{}\"", self.modified, self.sequence)
    }
}
