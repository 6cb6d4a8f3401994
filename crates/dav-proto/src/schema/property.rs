/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DavProperty {
    WebDav(WebDavProperty),
    CardDav(CardDavProperty),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebDavProperty {
    CreationDate,
    DisplayName,
    GetETag,
    GetLastModified,
    GetContentLength,
    GetContentType,
    ResourceType,
    Owner,
    CurrentUserPrincipal,
    CurrentUserPrivilegeSet,
    Acl,
    SupportedReportSet,
    PrincipalCollectionSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardDavProperty {
    AddressData,
    AddressbookDescription,
    SupportedAddressData,
    MaxResourceSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Collection,
    AddressBook,
    Principal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSet {
    AddressbookQuery,
    AddressbookMultiGet,
    AclPrincipalPropSet,
    PrincipalMatch,
}

/// Epoch seconds rendered in the RFC 1123 form used by Last-Modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rfc1123DateTime(i64);

impl Rfc1123DateTime {
    pub fn new(timestamp: i64) -> Self {
        Rfc1123DateTime(timestamp)
    }
}

impl Display for Rfc1123DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match chrono::DateTime::from_timestamp(self.0, 0) {
            Some(dt) => write!(f, "{}", dt.format("%a, %d %b %Y %H:%M:%S GMT")),
            None => write!(f, "Thu, 01 Jan 1970 00:00:00 GMT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Rfc1123DateTime;

    #[test]
    fn rfc1123_format() {
        assert_eq!(
            Rfc1123DateTime::new(0).to_string(),
            "Thu, 01 Jan 1970 00:00:00 GMT"
        );
        assert_eq!(
            Rfc1123DateTime::new(1634515200).to_string(),
            "Mon, 18 Oct 2021 00:00:00 GMT"
        );
    }
}
