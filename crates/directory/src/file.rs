/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

/// A binary attachment stored in an ordinary (non address book) collection.
///
/// `sequence` is bumped by the backend on every update; together with
/// `modified` it versions the resource. The `prev_*` pair is captured when
/// the resource is bound to a request and feeds the precondition check.
/// Content is fetched lazily.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileResource {
    pub name: String,
    pub content_type: Option<String>,
    pub content_length: u32,
    pub created: i64,
    pub modified: i64,
    pub sequence: u32,
    pub prev_modified: Option<i64>,
    pub prev_sequence: Option<u32>,
    pub content: Option<Vec<u8>>,
}

impl FileResource {
    pub fn new(name: impl Into<String>) -> Self {
        FileResource {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Remember the current revision before any mutation is decided.
    pub fn capture_prev(&mut self) {
        if self.prev_modified.is_none() {
            self.prev_modified = Some(self.modified);
        }
        if self.prev_sequence.is_none() {
            self.prev_sequence = Some(self.sequence);
        }
    }

    pub fn set_content(&mut self, content_type: Option<String>, content: Vec<u8>) {
        self.content_type = content_type;
        self.content_length = content.len() as u32;
        self.content = Some(content);
    }
}
