/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

/// WebDAV privilege capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    All,
    /// Any privilege at all; used for "may this principal see the node".
    Any,
    Read,
    ReadAcl,
    ReadCurrentUserPrivilegeSet,
    Write,
    WriteAcl,
    WriteProperties,
    WriteContent,
    Bind,
    Unbind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AceWho {
    Owner,
    All,
    Authenticated,
    Unauthenticated,
    User,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ace {
    pub who: AceWho,
    /// Principal name for `User`/`Group` entries.
    pub name: Option<String>,
    pub privileges: Vec<Privilege>,
    pub inverted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    pub aces: Vec<Ace>,
}

/// Outcome of a privilege evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentAccess {
    pub allowed: bool,
    pub acl: Option<Acl>,
}

impl CurrentAccess {
    pub fn allowed() -> Self {
        CurrentAccess {
            allowed: true,
            acl: None,
        }
    }

    pub fn denied() -> Self {
        CurrentAccess::default()
    }
}
