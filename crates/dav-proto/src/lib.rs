/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

pub mod schema;

/// WebDAV Depth header value. `None` means the header was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    Zero,
    One,
    Infinity,
    #[default]
    None,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
            Depth::None => "",
        }
    }
}

/// Prefer header return directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Return {
    Minimal,
    Representation,
    #[default]
    Default,
}

/// Conditional headers applied to a single write.
///
/// `create` is set by `If-None-Match: *`, `if_etag` carries the `If-Match`
/// value verbatim, including the surrounding quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfHeaders {
    pub create: bool,
    pub if_etag: Option<String>,
}

#[derive(Debug)]
pub struct RequestHeaders<'x> {
    pub uri: &'x str,
    pub depth: Depth,
    pub ret: Return,
    pub if_headers: IfHeaders,
    pub content_type: Option<&'x str>,
    pub destination: Option<&'x str>,
    pub overwrite: bool,
}

impl<'x> RequestHeaders<'x> {
    pub fn new(uri: &'x str) -> Self {
        RequestHeaders {
            uri,
            depth: Depth::None,
            ret: Return::Default,
            if_headers: IfHeaders::default(),
            content_type: None,
            destination: None,
            overwrite: false,
        }
    }

    pub fn with_content_type(mut self, content_type: &'x str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_if_etag(mut self, etag: impl Into<String>) -> Self {
        self.if_headers.if_etag = Some(etag.into());
        self
    }

    pub fn with_create(mut self) -> Self {
        self.if_headers.create = true;
        self
    }

    pub fn with_destination(mut self, destination: &'x str) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}
