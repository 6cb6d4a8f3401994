/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use super::Namespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href(pub String);

impl From<String> for Href {
    fn from(value: String) -> Self {
        Href(value)
    }
}

impl From<&str> for Href {
    fn from(value: &str) -> Self {
        Href(value.to_string())
    }
}

/// Typed precondition/postcondition elements attached to error responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Base(BaseCondition),
    Card(CardCondition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseCondition {
    ResourceMustBeNull,
    ValidResourceType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCondition {
    SupportedAddressData,
    SupportedFilter,
    NoUidConflict(Href),
    AddressbookCollectionLocationOk,
    MaxResourceSize(u32),
}

impl Condition {
    pub fn namespace(&self) -> Namespace {
        match self {
            Condition::Base(_) => Namespace::Dav,
            Condition::Card(_) => Namespace::CardDav,
        }
    }

    pub fn element_name(&self) -> &'static str {
        match self {
            Condition::Base(BaseCondition::ResourceMustBeNull) => "resource-must-be-null",
            Condition::Base(BaseCondition::ValidResourceType) => "valid-resourcetype",
            Condition::Card(CardCondition::SupportedAddressData) => "supported-address-data",
            Condition::Card(CardCondition::SupportedFilter) => "supported-filter",
            Condition::Card(CardCondition::NoUidConflict(_)) => "no-uid-conflict",
            Condition::Card(CardCondition::AddressbookCollectionLocationOk) => {
                "addressbook-collection-location-ok"
            }
            Condition::Card(CardCondition::MaxResourceSize(_)) => "max-resource-size",
        }
    }
}

impl From<BaseCondition> for Condition {
    fn from(value: BaseCondition) -> Self {
        Condition::Base(value)
    }
}

impl From<CardCondition> for Condition {
    fn from(value: CardCondition) -> Self {
        Condition::Card(value)
    }
}
