/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::principal::Principal;

/// A WebDAV collection. `address_book` selects which child kind it holds:
/// address books contain cards only, ordinary collections contain
/// sub-collections and binary resources only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    /// Normalized path, always ending with `/`.
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub address_book: bool,
    pub owner: Option<Principal>,
    pub created: i64,
    pub modified: i64,
}

impl Collection {
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        let name = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Collection {
            path,
            name,
            ..Default::default()
        }
    }

    pub fn address_book(mut self) -> Self {
        self.address_book = true;
        self
    }

    /// Path of the parent collection, `None` at the root.
    pub fn parent_path(&self) -> Option<&str> {
        let trimmed = self.path.trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        trimmed.rfind('/').map(|pos| &self.path[..pos + 1])
    }
}

#[cfg(test)]
mod tests {
    use super::Collection;

    #[test]
    fn collection_paths() {
        let col = Collection::new("/ab/alice/contacts");
        assert_eq!(col.path, "/ab/alice/contacts/");
        assert_eq!(col.name, "contacts");
        assert_eq!(col.parent_path(), Some("/ab/alice/"));
        assert_eq!(Collection::new("/").parent_path(), None);
    }
}
