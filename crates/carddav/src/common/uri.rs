/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use crate::{DavError, DavErrorCondition, Server, node::DavNode};
use dav_proto::schema::response::BaseCondition;
use directory::{
    DirectoryHandler, card::Card, collection::Collection, file::FileResource,
};
use hyper::StatusCode;
use percent_encoding::percent_decode_str;

/// Existence demanded of the resolved entity.
#[derive(Debug)]
pub enum Resolve {
    Must,
    MustNot,
    May,
    /// The caller already holds the entity (produced by a prior search);
    /// skip the backend lookup and wrap it.
    AlreadyResolved(Precomputed),
}

#[derive(Debug)]
pub enum Precomputed {
    Collection(Collection),
    Card { collection: Collection, card: Card },
    File { collection: Collection, file: FileResource },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Collection,
    Entity,
    Principal,
    Unknown,
}

/// Canonical form of a request path: percent-decoded, `.`/`..` resolved,
/// duplicate slashes collapsed, trailing slash preserved.
pub fn normalize_uri(uri: &str) -> crate::Result<String> {
    let decoded = percent_decode_str(uri)
        .decode_utf8()
        .map_err(|_| DavError::Code(StatusCode::BAD_REQUEST))?;

    if !decoded.starts_with('/') {
        return Err(DavError::Code(StatusCode::BAD_REQUEST));
    }

    let trailing = decoded.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(DavError::Code(StatusCode::BAD_REQUEST));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Ok("/".to_string());
    }

    let mut path = String::with_capacity(decoded.len() + 1);
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    if trailing {
        path.push('/');
    }

    Ok(path)
}

/* Split a normalized path into the parent collection path and the leaf
 * name. The parent keeps its trailing slash. */
fn split_uri(uri: &str) -> crate::Result<(&str, Option<&str>)> {
    let trimmed = uri.trim_end_matches('/');
    if trimmed.is_empty() {
        // Root has no name part.
        return Ok((uri, None));
    }

    let pos = trimmed
        .rfind('/')
        .ok_or(DavError::Code(StatusCode::BAD_REQUEST))?;

    Ok((&uri[..pos + 1], Some(&trimmed[pos + 1..])))
}

pub trait DavUriResource<D: DirectoryHandler> {
    /// Turn a raw request path plus an existence/type expectation into a
    /// typed node reference.
    fn resolve_uri(
        &self,
        directory: &D,
        uri: &str,
        resolve: Resolve,
        hint: NodeType,
    ) -> impl Future<Output = crate::Result<DavNode>> + Send;
}

impl<D: DirectoryHandler> DavUriResource<D> for Server<D> {
    async fn resolve_uri(
        &self,
        directory: &D,
        uri: &str,
        resolve: Resolve,
        hint: NodeType,
    ) -> crate::Result<DavNode> {
        let uri = normalize_uri(uri)?;

        if directory.is_principal(&uri) {
            let principal = directory
                .principal(&uri)
                .await?
                .ok_or(DavError::Code(StatusCode::NOT_FOUND))?;
            return Ok(DavNode::Principal { principal });
        } else if hint == NodeType::Principal {
            return Err(DavError::Code(StatusCode::NOT_FOUND));
        }

        let resolve = match resolve {
            Resolve::AlreadyResolved(precomputed) => {
                return Ok(match precomputed {
                    Precomputed::Collection(collection) => DavNode::Collection {
                        collection,
                        parent: None,
                        exists: true,
                    },
                    Precomputed::Card { collection, card } => {
                        let name = card
                            .name
                            .clone()
                            .ok_or(DavError::Code(StatusCode::INTERNAL_SERVER_ERROR))?;
                        DavNode::Card {
                            collection,
                            card: Some(card),
                            name,
                            exists: true,
                        }
                    }
                    Precomputed::File { collection, file } => DavNode::File {
                        collection,
                        file,
                        exists: true,
                    },
                });
            }
            resolve => resolve,
        };

        if uri.ends_with('/') && matches!(hint, NodeType::Collection | NodeType::Unknown) {
            // For an unknown type the full path is tried as a collection
            // first.
            tracing::debug!(uri = uri.as_str(), "collection lookup");
            if let Some(collection) = directory.collection(&uri).await? {
                if matches!(resolve, Resolve::MustNot) {
                    return Err(DavErrorCondition::new(
                        StatusCode::FORBIDDEN,
                        BaseCondition::ResourceMustBeNull,
                    )
                    .into());
                }

                return Ok(DavNode::Collection {
                    collection,
                    parent: None,
                    exists: true,
                });
            } else if hint == NodeType::Collection && matches!(resolve, Resolve::Must) {
                return Err(DavError::Code(StatusCode::NOT_FOUND));
            }
            // Fall through and retry as an entity.
        }

        let (parent_path, name) = split_uri(&uri)?;
        let Some(name) = name else {
            return Err(DavError::Code(StatusCode::NOT_FOUND));
        };

        let Some(parent) = directory.collection(parent_path).await? else {
            return Err(if hint == NodeType::Collection {
                // Creating a collection without an intermediate parent.
                DavError::Code(StatusCode::CONFLICT)
            } else {
                DavError::Code(StatusCode::NOT_FOUND)
            });
        };

        if hint == NodeType::Collection {
            let mut collection = Collection::new(format!("{parent_path}{name}/"));
            collection.owner = parent.owner.clone();
            return Ok(DavNode::Collection {
                collection,
                parent: Some(parent),
                exists: false,
            });
        }

        if parent.address_book {
            tracing::debug!(
                collection = parent.path.as_str(),
                name,
                "card lookup"
            );
            let mut card = directory.card(&parent.path, name).await?;
            if let Some(card) = card.as_mut() {
                card.capture_prev();
            } else if matches!(resolve, Resolve::Must) {
                return Err(DavError::Code(StatusCode::NOT_FOUND));
            }

            let exists = card.is_some();
            Ok(DavNode::Card {
                collection: parent,
                card,
                name: name.to_string(),
                exists,
            })
        } else {
            tracing::debug!(
                collection = parent.path.as_str(),
                name,
                "resource lookup"
            );
            let file = directory.file(&parent, name).await?;
            if file.is_none() && matches!(resolve, Resolve::Must) {
                return Err(DavError::Code(StatusCode::NOT_FOUND));
            }

            let exists = file.is_some();
            let mut file = file.unwrap_or_else(|| FileResource::new(name));
            file.capture_prev();

            Ok(DavNode::File {
                collection: parent,
                file,
                exists,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_uri, split_uri};

    #[test]
    fn normalization_is_idempotent() {
        for uri in [
            "/ab/alice/contacts/",
            "/ab//alice/./contacts/../cards/bob.vcf",
            "/a%20b/c.vcf",
            "/",
        ] {
            let once = normalize_uri(uri).unwrap();
            assert_eq!(normalize_uri(&once).unwrap(), once);
        }
    }

    #[test]
    fn normalization_resolves_segments() {
        assert_eq!(
            normalize_uri("/ab//alice/./x/../contacts/").unwrap(),
            "/ab/alice/contacts/"
        );
        assert_eq!(normalize_uri("/a%20b/c.vcf").unwrap(), "/a b/c.vcf");
        assert_eq!(normalize_uri("/a/b").unwrap(), "/a/b");
        assert_eq!(normalize_uri("/a/../..").is_err(), true);
        assert!(normalize_uri("no-slash").is_err());
    }

    #[test]
    fn split_keeps_parent_slash() {
        assert_eq!(
            split_uri("/ab/alice/bob.vcf").unwrap(),
            ("/ab/alice/", Some("bob.vcf"))
        );
        assert_eq!(split_uri("/ab/alice/").unwrap(), ("/ab/", Some("alice")));
        assert_eq!(split_uri("/").unwrap(), ("/", None));
    }
}
