/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardDavConfig {
    /// Path prefixes served by distinct directory handlers; the longest
    /// matching prefix keys the handler pool.
    pub handler_prefixes: Vec<String>,
    /// Maximum accepted vCard payload size in bytes.
    pub max_resource_size: usize,
    /// Refuse collection listings over plain GET.
    pub directory_browsing_disallowed: bool,
}

impl Default for CardDavConfig {
    fn default() -> Self {
        CardDavConfig {
            handler_prefixes: vec!["/".to_string()],
            max_resource_size: 102_400,
            directory_browsing_disallowed: false,
        }
    }
}

impl CardDavConfig {
    /// Longest configured prefix matching `path`; falls back to the root.
    pub fn handler_prefix<'x>(&'x self, path: &str) -> &'x str {
        self.handler_prefixes
            .iter()
            .filter(|prefix| path.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .map(String::as_str)
            .unwrap_or("/")
    }
}
