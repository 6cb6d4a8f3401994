/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrincipalKind {
    #[default]
    User,
    Group,
}

/// An identity subject to addressing and access control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub account: String,
    /// Principal path, e.g. `/principals/users/alice`.
    pub principal_ref: String,
    pub description: Option<String>,
}

impl Principal {
    pub fn user(account: impl Into<String>, principal_ref: impl Into<String>) -> Self {
        Principal {
            kind: PrincipalKind::User,
            account: account.into(),
            principal_ref: principal_ref.into(),
            description: None,
        }
    }

    pub fn group(account: impl Into<String>, principal_ref: impl Into<String>) -> Self {
        Principal {
            kind: PrincipalKind::Group,
            account: account.into(),
            principal_ref: principal_ref.into(),
            description: None,
        }
    }
}
