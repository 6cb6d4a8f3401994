/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::vcard::VCard;

/// A single address object: a parsed vCard plus the bookkeeping the
/// protocol needs around it.
///
/// `name` is unique within the owning collection, the UID distinguishes the
/// card globally. `prev_modified` is captured when the card is bound to a
/// request and is the value preconditions are checked against before an
/// overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    pub name: Option<String>,
    pub vcard: VCard,
    pub created: i64,
    pub modified: i64,
    pub prev_modified: Option<i64>,
}

impl Card {
    pub fn new(vcard: VCard) -> Self {
        Card {
            vcard,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn uid(&self) -> Option<&str> {
        self.vcard.uid()
    }

    /// Remember the current revision before any mutation is decided.
    pub fn capture_prev(&mut self) {
        if self.prev_modified.is_none() {
            self.prev_modified = Some(self.modified);
        }
    }
}
