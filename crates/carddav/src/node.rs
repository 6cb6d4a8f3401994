/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::common::ETag;
use dav_proto::schema::property::{ReportSet, ResourceType};
use directory::{card::Card, collection::Collection, file::FileResource, principal::Principal};
use hyper::StatusCode;

/// Typed reference to the entity a request path denotes.
///
/// References are read-only snapshots built per request; `exists == false`
/// is only valid for targets about to be created. `Error` stands in for a
/// multiget href that failed to resolve.
#[derive(Debug, Clone)]
pub enum DavNode {
    Collection {
        collection: Collection,
        /// Owning collection, present for not-yet-existing collections
        /// built for MKCOL.
        parent: Option<Collection>,
        exists: bool,
    },
    Card {
        collection: Collection,
        card: Option<Card>,
        name: String,
        exists: bool,
    },
    File {
        collection: Collection,
        file: FileResource,
        exists: bool,
    },
    Principal {
        principal: Principal,
    },
    Error {
        href: String,
        status: StatusCode,
        collection: bool,
    },
}

impl DavNode {
    pub fn href(&self) -> String {
        match self {
            DavNode::Collection { collection, .. } => collection.path.clone(),
            DavNode::Card {
                collection, name, ..
            } => format!("{}{}", collection.path, name),
            DavNode::File {
                collection, file, ..
            } => format!("{}{}", collection.path, file.name),
            DavNode::Principal { principal } => principal.principal_ref.clone(),
            DavNode::Error { href, .. } => href.clone(),
        }
    }

    pub fn exists(&self) -> bool {
        match self {
            DavNode::Collection { exists, .. }
            | DavNode::Card { exists, .. }
            | DavNode::File { exists, .. } => *exists,
            DavNode::Principal { .. } => true,
            DavNode::Error { .. } => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            DavNode::Collection { .. } | DavNode::Error { collection: true, .. }
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DavNode::Error { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Version token for the current revision.
    pub fn etag(&self, strong: bool) -> Option<String> {
        match self {
            DavNode::Collection {
                collection, exists, ..
            } => exists.then(|| weaken(collection.etag(), strong)),
            DavNode::Card { card, .. } => {
                card.as_ref().map(|card| weaken(card.etag(), strong))
            }
            DavNode::File { file, exists, .. } => {
                exists.then(|| weaken(file.etag(), strong))
            }
            DavNode::Principal { .. } | DavNode::Error { .. } => None,
        }
    }

    /// Version token captured before any mutation of this request; this is
    /// the value `If-Match` preconditions are compared against.
    pub fn prev_etag(&self, strong: bool) -> Option<String> {
        match self {
            DavNode::Card { card, .. } => card.as_ref().map(|card| {
                let prev = card.prev_modified.unwrap_or(card.modified);
                weaken(format!("\"{prev}\""), strong)
            }),
            DavNode::File { file, exists, .. } => exists.then(|| {
                let prev = file.prev_modified.unwrap_or(file.modified);
                let prev_seq = file.prev_sequence.unwrap_or(file.sequence);
                weaken(format!("\"{prev}-{prev_seq}\""), strong)
            }),
            _ => self.etag(strong),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            DavNode::Card { .. } => Some("text/vcard"),
            DavNode::File { file, .. } => file.content_type.as_deref(),
            _ => None,
        }
    }

    pub fn content_length(&self) -> Option<u32> {
        match self {
            DavNode::File { file, .. } => Some(file.content_length),
            _ => None,
        }
    }

    pub fn created(&self) -> Option<i64> {
        match self {
            DavNode::Collection { collection, .. } => Some(collection.created),
            DavNode::Card { card, .. } => card.as_ref().map(|card| card.created),
            DavNode::File { file, .. } => Some(file.created),
            _ => None,
        }
    }

    pub fn modified(&self) -> Option<i64> {
        match self {
            DavNode::Collection { collection, .. } => Some(collection.modified),
            DavNode::Card { card, .. } => card.as_ref().map(|card| card.modified),
            DavNode::File { file, .. } => Some(file.modified),
            _ => None,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            DavNode::Collection { collection, .. } => Some(collection.name.as_str()),
            DavNode::Card { card, name, .. } => card
                .as_ref()
                .and_then(|card| card.name.as_deref())
                .or(Some(name.as_str())),
            DavNode::File { file, .. } => Some(file.name.as_str()),
            DavNode::Principal { principal } => Some(principal.account.as_str()),
            DavNode::Error { .. } => None,
        }
    }

    pub fn resource_type(&self) -> Option<Vec<ResourceType>> {
        match self {
            DavNode::Collection { collection, .. } if collection.address_book => {
                Some(vec![ResourceType::Collection, ResourceType::AddressBook])
            }
            DavNode::Collection { .. } => Some(vec![ResourceType::Collection]),
            DavNode::Principal { .. } => Some(vec![ResourceType::Principal]),
            _ => None,
        }
    }

    pub fn supported_report_set(&self) -> Option<Vec<ReportSet>> {
        match self {
            DavNode::Collection { collection, .. } if collection.address_book => Some(vec![
                ReportSet::AddressbookQuery,
                ReportSet::AddressbookMultiGet,
                ReportSet::AclPrincipalPropSet,
            ]),
            DavNode::Collection { .. } => Some(vec![ReportSet::AclPrincipalPropSet]),
            _ => None,
        }
    }

    /// Owning collection of a non-collection reference.
    pub fn parent(&self) -> Option<&Collection> {
        match self {
            DavNode::Collection { parent, .. } => parent.as_ref(),
            DavNode::Card { collection, .. } | DavNode::File { collection, .. } => {
                Some(collection)
            }
            DavNode::Principal { .. } | DavNode::Error { .. } => None,
        }
    }

    /// Leaf entity name; `None` for a bare collection or principal.
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            DavNode::Card { name, .. } => Some(name.as_str()),
            DavNode::File { file, .. } => Some(file.name.as_str()),
            _ => None,
        }
    }
}

fn weaken(tag: String, strong: bool) -> String {
    if strong { tag } else { format!("W/{tag}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory::file::FileResource;

    #[test]
    fn etag_is_a_function_of_lastmod_and_sequence() {
        let mut file = FileResource::new("photo.png");
        file.modified = 100;
        file.sequence = 2;
        let node = DavNode::File {
            collection: Collection::new("/files/"),
            file: file.clone(),
            exists: true,
        };
        assert_eq!(node.etag(true).as_deref(), Some("\"100-2\""));
        assert_eq!(node.etag(false).as_deref(), Some("W/\"100-2\""));

        file.sequence = 3;
        let node = DavNode::File {
            collection: Collection::new("/files/"),
            file,
            exists: true,
        };
        assert_eq!(node.etag(true).as_deref(), Some("\"100-3\""));
    }

    #[test]
    fn prev_etag_uses_captured_revision() {
        let mut card = Card::default();
        card.modified = 7;
        card.capture_prev();
        card.modified = 9;
        let node = DavNode::Card {
            collection: Collection::new("/ab/").address_book(),
            card: Some(card),
            name: "a.vcf".to_string(),
            exists: true,
        };
        assert_eq!(node.etag(true).as_deref(), Some("\"9\""));
        assert_eq!(node.prev_etag(true).as_deref(), Some("\"7\""));
    }

    #[test]
    fn href_joins_collection_and_name() {
        let node = DavNode::Card {
            collection: Collection::new("/ab/alice/contacts/").address_book(),
            card: None,
            name: "bob.vcf".to_string(),
            exists: false,
        };
        assert_eq!(node.href(), "/ab/alice/contacts/bob.vcf");
    }
}
