/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use super::{property::DavProperty, MatchType};
use calcard::vcard::VCardProperty;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropFind {
    #[default]
    PropName,
    AllProp(Vec<DavProperty>),
    Prop(Vec<DavProperty>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    AddressbookQuery(AddressbookQuery),
    AddressbookMultiGet(MultiGet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressbookQuery {
    pub properties: PropFind,
    pub filter: Filter,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiGet {
    pub properties: PropFind,
    pub hrefs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkCol {
    pub is_addressbook: bool,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// Address-book search filter: a single combinator over property tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub test: FilterTest,
    pub props: Vec<PropFilter>,
}

impl Filter {
    /// An empty filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterTest {
    #[default]
    AllOf,
    AnyOf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropFilter {
    pub name: VCardProperty,
    pub op: FilterOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    /// The property must be present. This is the bare `prop-filter` form.
    Exists,
    /// The property must be absent (`is-not-defined`).
    Undefined,
    TextMatch(TextMatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub value: String,
    pub match_type: MatchType,
    /// `None` means the attribute was not given; the defaulted form is
    /// case-sensitive.
    pub caseless: Option<bool>,
    pub negate: bool,
}

impl TextMatch {
    pub fn new(match_type: MatchType, value: impl Into<String>) -> Self {
        TextMatch {
            value: value.into(),
            match_type,
            caseless: None,
            negate: false,
        }
    }

    pub fn caseless(mut self) -> Self {
        self.caseless = Some(true);
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn is_caseless(&self) -> bool {
        self.caseless.unwrap_or(false)
    }
}

impl PropFilter {
    pub fn exists(name: VCardProperty) -> Self {
        PropFilter {
            name,
            op: FilterOp::Exists,
        }
    }

    pub fn undefined(name: VCardProperty) -> Self {
        PropFilter {
            name,
            op: FilterOp::Undefined,
        }
    }

    pub fn text(name: VCardProperty, text_match: TextMatch) -> Self {
        PropFilter {
            name,
            op: FilterOp::TextMatch(text_match),
        }
    }
}
