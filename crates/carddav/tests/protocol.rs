/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use calcard::{Entry, Parser, vcard::VCard, vcard::VCardProperty};
use carddav::{
    Server,
    card::update::CardUpdateRequestHandler,
    collection::{CopyMoveRequestHandler, MkColRequestHandler},
    common::uri::{DavUriResource, NodeType, Resolve},
    config::CardDavConfig,
    delete::DeleteRequestHandler,
    file::update::FileUpdateRequestHandler,
    get::{Content, GetRequestHandler},
    node::DavNode,
    report::ReportRequestHandler,
};
use dav_proto::{
    Depth, RequestHeaders,
    schema::{
        MatchType,
        request::{
            AddressbookQuery, Filter, FilterTest, MkCol, MultiGet, PropFilter, PropFind,
            Report, TextMatch,
        },
    },
};
use directory::{
    AccessToken, DirectoryHandler, Error, MkColStatus, Result,
    acl::{CurrentAccess, Privilege},
    card::Card,
    collection::Collection,
    file::FileResource,
    pool::HandlerKey,
    principal::Principal,
    query::{GetLimits, GetResult},
};
use hyper::StatusCode;
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MemState {
    clock: i64,
    collections: BTreeMap<String, Collection>,
    cards: BTreeMap<(String, String), Card>,
    files: BTreeMap<(String, String), FileResource>,
    principals: BTreeMap<String, Principal>,
    deny: Option<Privilege>,
    server_cap: Option<usize>,
}

#[derive(Clone)]
struct MemDirectory {
    state: Arc<Mutex<MemState>>,
    mutations: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl MemDirectory {
    fn new() -> Self {
        MemDirectory {
            state: Arc::new(Mutex::new(MemState::default())),
            mutations: Arc::new(AtomicUsize::new(0)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn add_collection(&self, path: &str, address_book: bool) {
        let mut collection = Collection::new(path);
        collection.address_book = address_book;
        self.state
            .lock()
            .collections
            .insert(collection.path.clone(), collection);
    }

    fn seed_card(&self, collection: &str, name: &str, vcard: VCard) {
        let mut state = self.state.lock();
        state.clock += 1;
        let card = Card {
            name: Some(name.to_string()),
            vcard,
            created: state.clock,
            modified: state.clock,
            prev_modified: None,
        };
        state
            .cards
            .insert((collection.to_string(), name.to_string()), card);
    }

    fn seed_file(&self, collection: &str, name: &str, content: &[u8]) {
        let mut state = self.state.lock();
        state.clock += 1;
        let mut file = FileResource::new(name);
        file.created = state.clock;
        file.modified = state.clock;
        file.sequence = 1;
        file.content_type = Some("application/octet-stream".to_string());
        file.content_length = content.len() as u32;
        file.content = Some(content.to_vec());
        state
            .files
            .insert((collection.to_string(), name.to_string()), file);
    }
}

impl DirectoryHandler for MemDirectory {
    fn open(&self, _account: Option<&str>) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {}

    fn is_principal(&self, path: &str) -> bool {
        path.starts_with("/principals/")
    }

    async fn principal(&self, path: &str) -> Result<Option<Principal>> {
        Ok(self
            .state
            .lock()
            .principals
            .get(path.trim_end_matches('/'))
            .cloned())
    }

    async fn principal_home(&self, _principal: &Principal) -> Result<Option<String>> {
        Ok(None)
    }

    async fn collection(&self, path: &str) -> Result<Option<Collection>> {
        Ok(self.state.lock().collections.get(path).cloned())
    }

    async fn collections(
        &self,
        parent: &str,
        limits: &GetLimits,
    ) -> Result<GetResult<Collection>> {
        let state = self.state.lock();
        let mut entries: Vec<Collection> = state
            .collections
            .values()
            .filter(|collection| collection.parent_path() == Some(parent))
            .cloned()
            .collect();

        let mut result = GetResult::default();
        if let Some(limit) = limits.limit {
            if entries.len() > limit {
                entries.truncate(limit);
                result.over_limit = true;
            }
        }
        result.entries = entries;
        Ok(result)
    }

    async fn make_collection(
        &self,
        collection: &Collection,
        _parent_path: &str,
    ) -> Result<MkColStatus> {
        let mut state = self.state.lock();
        if state.collections.contains_key(&collection.path) {
            return Ok(MkColStatus::AlreadyExists);
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        state
            .collections
            .insert(collection.path.clone(), collection.clone());
        Ok(MkColStatus::Created)
    }

    async fn delete_collection(&self, collection: &Collection) -> Result<()> {
        let mut state = self.state.lock();
        if state.collections.remove(&collection.path).is_none() {
            return Err(Error::NotFound);
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        state.cards.retain(|(path, _), _| path != &collection.path);
        state.files.retain(|(path, _), _| path != &collection.path);
        Ok(())
    }

    async fn copy_move_collection(
        &self,
        from: &Collection,
        to_path: &str,
        copy: bool,
        _overwrite: bool,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        let created = !state.collections.contains_key(to_path);
        let mut moved = from.clone();
        moved.path = to_path.to_string();
        state.collections.insert(to_path.to_string(), moved);
        if !copy {
            state.collections.remove(&from.path);
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn card(&self, collection_path: &str, name: &str) -> Result<Option<Card>> {
        Ok(self
            .state
            .lock()
            .cards
            .get(&(collection_path.to_string(), name.to_string()))
            .cloned())
    }

    async fn cards(
        &self,
        collection: &Collection,
        filter: Option<&Filter>,
        limits: &GetLimits,
    ) -> Result<GetResult<Card>> {
        let state = self.state.lock();
        let mut entries: Vec<Card> = state
            .cards
            .iter()
            .filter(|((path, _), _)| path == &collection.path)
            .map(|(_, card)| card.clone())
            .filter(|card| {
                filter.is_none_or(|filter| carddav::card::query::vcard_matches(&card.vcard, filter))
            })
            .collect();

        let mut result = GetResult::default();
        if let Some(cap) = state.server_cap {
            if entries.len() > cap {
                entries.truncate(cap);
                result.server_truncated = true;
            }
        }
        if let Some(limit) = limits.limit {
            if entries.len() > limit {
                entries.truncate(limit);
                result.over_limit = true;
            }
        }
        result.entries = entries;
        Ok(result)
    }

    async fn add_card(&self, collection_path: &str, card: &Card) -> Result<()> {
        let mut state = self.state.lock();
        state.clock += 1;
        let mut card = card.clone();
        card.created = state.clock;
        card.modified = state.clock;
        let name = card.name.clone().ok_or(Error::Illegal("no name".into()))?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        state
            .cards
            .insert((collection_path.to_string(), name), card);
        Ok(())
    }

    async fn update_card(&self, collection_path: &str, card: &Card) -> Result<()> {
        let mut state = self.state.lock();
        state.clock += 1;
        let clock = state.clock;
        let name = card.name.clone().ok_or(Error::Illegal("no name".into()))?;
        let entry = state
            .cards
            .get_mut(&(collection_path.to_string(), name))
            .ok_or(Error::NotFound)?;
        entry.vcard = card.vcard.clone();
        entry.modified = clock;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_card(&self, collection_path: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state
            .cards
            .remove(&(collection_path.to_string(), name.to_string()))
            .ok_or(Error::NotFound)?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn copy_move_card(
        &self,
        from: &Card,
        to_path: &str,
        name: &str,
        copy: bool,
        overwrite: bool,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        let key = (to_path.to_string(), name.to_string());
        let created = !state.cards.contains_key(&key);
        if !created && !overwrite {
            return Err(Error::DestinationExists);
        }
        let mut card = from.clone();
        card.name = Some(name.to_string());
        if !copy {
            let from_name = from.name.clone().unwrap_or_default();
            state
                .cards
                .retain(|entry_key, _| !(entry_key.1 == from_name && *entry_key != key));
        }
        state.cards.insert(key, card);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn file(&self, collection: &Collection, name: &str) -> Result<Option<FileResource>> {
        Ok(self
            .state
            .lock()
            .files
            .get(&(collection.path.clone(), name.to_string()))
            .map(|file| {
                // Metadata only; content is fetched on demand.
                let mut file = file.clone();
                file.content = None;
                file
            }))
    }

    async fn file_content(&self, file: &FileResource) -> Result<Vec<u8>> {
        let state = self.state.lock();
        state
            .files
            .values()
            .find(|stored| stored.name == file.name)
            .and_then(|stored| stored.content.clone())
            .ok_or(Error::NotFound)
    }

    async fn put_file(&self, collection: &Collection, file: &FileResource) -> Result<()> {
        let mut state = self.state.lock();
        state.clock += 1;
        let mut file = file.clone();
        file.created = state.clock;
        file.modified = state.clock;
        file.sequence = 1;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        state
            .files
            .insert((collection.path.clone(), file.name.clone()), file);
        Ok(())
    }

    async fn update_file(&self, file: &FileResource) -> Result<()> {
        let mut state = self.state.lock();
        state.clock += 1;
        let clock = state.clock;
        let entry = state
            .files
            .values_mut()
            .find(|stored| stored.name == file.name)
            .ok_or(Error::NotFound)?;
        entry.content = file.content.clone();
        entry.content_type = file.content_type.clone();
        entry.content_length = file.content_length;
        entry.modified = clock;
        entry.sequence += 1;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_file(&self, collection: &Collection, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state
            .files
            .remove(&(collection.path.clone(), name.to_string()))
            .ok_or(Error::NotFound)?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn copy_move_file(
        &self,
        from: &FileResource,
        to_path: &str,
        name: &str,
        copy: bool,
        overwrite: bool,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        let key = (to_path.to_string(), name.to_string());
        let created = !state.files.contains_key(&key);
        if !created && !overwrite {
            return Err(Error::DestinationExists);
        }
        let mut file = from.clone();
        file.name = name.to_string();
        state.files.insert(key, file);
        if !copy {
            state
                .files
                .retain(|(_, name), _| name != &from.name);
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn check_access(
        &self,
        _collection: &Collection,
        privilege: Privilege,
        return_result: bool,
    ) -> Result<CurrentAccess> {
        let denied = self.state.lock().deny == Some(privilege);
        if denied {
            if return_result {
                Ok(CurrentAccess::denied())
            } else {
                Err(Error::NoAccess)
            }
        } else {
            Ok(CurrentAccess::allowed())
        }
    }
}

fn vcard(full_name: &str, uid: &str) -> VCard {
    let raw = format!(
        "BEGIN:VCARD\r\nVERSION:4.0\r\nUID:{uid}\r\nFN:{full_name}\r\nEND:VCARD\r\n"
    );
    match Parser::new(&raw).entry() {
        Entry::VCard(vcard) => vcard,
        other => panic!("expected a vCard, got {other:?}"),
    }
}

fn vcard_bytes(full_name: &str, uid: &str) -> Vec<u8> {
    format!("BEGIN:VCARD\r\nVERSION:4.0\r\nUID:{uid}\r\nFN:{full_name}\r\nEND:VCARD\r\n")
        .into_bytes()
}

fn seeded() -> (Server<MemDirectory>, MemDirectory) {
    seeded_with_config(CardDavConfig::default())
}

fn seeded_with_config(config: CardDavConfig) -> (Server<MemDirectory>, MemDirectory) {
    let dir = MemDirectory::new();
    dir.add_collection("/ab/", false);
    dir.add_collection("/ab/alice/", false);
    dir.add_collection("/ab/alice/contacts/", true);
    dir.add_collection("/ab/alice/attachments/", false);
    dir.seed_card("/ab/alice/contacts/", "bob.vcf", vcard("Bob Jones", "uid-bob"));
    dir.state.lock().principals.insert(
        "/principals/users/alice".to_string(),
        Principal::user("alice", "/principals/users/alice"),
    );

    let handle = dir.clone();
    let server = Server::new(config, move |_key: &HandlerKey| Ok(handle.clone()));
    (server, dir)
}

fn token() -> AccessToken {
    AccessToken::for_account("alice")
}

fn fn_contains(value: &str) -> Filter {
    Filter {
        test: FilterTest::AllOf,
        props: vec![PropFilter::text(
            VCardProperty::Fn,
            TextMatch::new(MatchType::Contains, value),
        )],
    }
}

fn query_report(filter: Filter, limit: Option<u32>) -> Report {
    Report::AddressbookQuery(AddressbookQuery {
        properties: PropFind::PropName,
        filter,
        limit,
    })
}

#[tokio::test]
async fn resolves_an_existing_address_book() {
    let (server, _dir) = seeded();
    let directory = server.directory("/ab/alice/contacts/", &token()).unwrap();

    let node = server
        .resolve_uri(
            &directory,
            "/ab/alice/contacts/",
            Resolve::Must,
            NodeType::Collection,
        )
        .await
        .unwrap();

    match node {
        DavNode::Collection {
            collection, exists, ..
        } => {
            assert!(exists);
            assert!(collection.address_book);
            assert_eq!(collection.path, "/ab/alice/contacts/");
        }
        other => panic!("expected a collection reference, got {other:?}"),
    }
}

#[tokio::test]
async fn resolving_a_missing_entity_is_not_found() {
    let (server, _dir) = seeded();
    let directory = server.directory("/", &token()).unwrap();

    let err = server
        .resolve_uri(
            &directory,
            "/ab/alice/contacts/ghost.vcf",
            Resolve::Must,
            NodeType::Entity,
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resolves_principals_before_anything_else() {
    let (server, _dir) = seeded();
    let directory = server.directory("/", &token()).unwrap();

    let node = server
        .resolve_uri(
            &directory,
            "/principals/users/alice",
            Resolve::Must,
            NodeType::Unknown,
        )
        .await
        .unwrap();
    assert!(matches!(node, DavNode::Principal { .. }));

    // A principal hint on a non-principal path never resolves.
    let err = server
        .resolve_uri(
            &directory,
            "/ab/alice/contacts/",
            Resolve::Must,
            NodeType::Principal,
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_creates_then_preconditions_guard_updates() {
    let (server, dir) = seeded();

    let headers = RequestHeaders::new("/ab/alice/contacts/carol.vcf")
        .with_content_type("text/vcard; charset=utf-8");
    let result = server
        .handle_card_update(&token(), &headers, vcard_bytes("Carol Smith", "uid-carol"))
        .await
        .unwrap();
    assert!(result.created);

    // Matching If-Match updates in place.
    let stored = dir.state.lock().cards
        [&("/ab/alice/contacts/".to_string(), "carol.vcf".to_string())]
        .modified;
    let headers = RequestHeaders::new("/ab/alice/contacts/carol.vcf")
        .with_content_type("text/vcard")
        .with_if_etag(format!("\"{stored}\""));
    let result = server
        .handle_card_update(&token(), &headers, vcard_bytes("Carol S.", "uid-carol"))
        .await
        .unwrap();
    assert!(!result.created);

    // A stale If-Match fails without touching the backend.
    let mutations = dir.mutation_count();
    let headers = RequestHeaders::new("/ab/alice/contacts/carol.vcf")
        .with_content_type("text/vcard")
        .with_if_etag(format!("\"{stored}\""));
    let err = server
        .handle_card_update(&token(), &headers, vcard_bytes("Carol X.", "uid-carol"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(dir.mutation_count(), mutations);
}

#[tokio::test]
async fn create_only_put_rejects_existing_targets() {
    let (server, dir) = seeded();
    let mutations = dir.mutation_count();

    let headers = RequestHeaders::new("/ab/alice/contacts/bob.vcf")
        .with_content_type("text/vcard")
        .with_create();
    let err = server
        .handle_card_update(&token(), &headers, vcard_bytes("Bob Jones", "uid-bob"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(dir.mutation_count(), mutations);

    // Against a missing target the create flag is irrelevant.
    let headers = RequestHeaders::new("/ab/alice/contacts/dave.vcf")
        .with_content_type("text/vcard")
        .with_create();
    let result = server
        .handle_card_update(&token(), &headers, vcard_bytes("Dave", "uid-dave"))
        .await
        .unwrap();
    assert!(result.created);
}

#[tokio::test]
async fn put_rejects_mismatched_payload_names() {
    let (server, dir) = seeded();
    // A stored card whose own name disagrees with its slot.
    {
        let mut state = dir.state.lock();
        let mut card = Card::new(vcard("Eve", "uid-eve")).with_name("other.vcf");
        card.modified = 1;
        state
            .cards
            .insert(("/ab/alice/contacts/".to_string(), "eve.vcf".to_string()), card);
    }

    let headers =
        RequestHeaders::new("/ab/alice/contacts/eve.vcf").with_content_type("text/vcard");
    let err = server
        .handle_card_update(&token(), &headers, vcard_bytes("Eve", "uid-eve"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_refuses_wrong_media_type_and_oversized_payloads() {
    let (server, _dir) = seeded_with_config(CardDavConfig {
        max_resource_size: 64,
        ..Default::default()
    });

    let headers =
        RequestHeaders::new("/ab/alice/contacts/x.vcf").with_content_type("text/plain");
    let err = server
        .handle_card_update(&token(), &headers, vcard_bytes("X", "uid-x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let headers =
        RequestHeaders::new("/ab/alice/contacts/x.vcf").with_content_type("text/vcard");
    let err = server
        .handle_card_update(
            &token(),
            &headers,
            vcard_bytes(&"Very Long Name ".repeat(16), "uid-x"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn put_denied_by_acl_is_forbidden() {
    let (server, dir) = seeded();
    dir.state.lock().deny = Some(Privilege::Bind);

    let headers =
        RequestHeaders::new("/ab/alice/contacts/x.vcf").with_content_type("text/vcard");
    let err = server
        .handle_card_update(&token(), &headers, vcard_bytes("X", "uid-x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mkcol_under_an_address_book_is_forbidden() {
    let (server, dir) = seeded();
    let mutations = dir.mutation_count();

    let headers = RequestHeaders::new("/ab/alice/contacts/nested/");
    let err = server
        .handle_mkcol_request(
            &token(),
            &headers,
            MkCol {
                is_addressbook: false,
                display_name: None,
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(dir.mutation_count(), mutations);
}

#[tokio::test]
async fn mkcol_creates_an_address_book() {
    let (server, dir) = seeded();

    let headers = RequestHeaders::new("/ab/alice/work/");
    let status = server
        .handle_mkcol_request(
            &token(),
            &headers,
            MkCol {
                is_addressbook: true,
                display_name: None,
                description: Some("work contacts".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(dir.state.lock().collections["/ab/alice/work/"].address_book);

    // The target location must be null.
    let err = server
        .handle_mkcol_request(
            &token(),
            &RequestHeaders::new("/ab/alice/work/"),
            MkCol {
                is_addressbook: false,
                display_name: None,
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    // A missing parent is a conflict.
    let err = server
        .handle_mkcol_request(
            &token(),
            &RequestHeaders::new("/ab/nobody/books/"),
            MkCol {
                is_addressbook: false,
                display_name: None,
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn query_filters_cards_in_an_address_book() {
    let (server, dir) = seeded();
    dir.seed_card(
        "/ab/alice/contacts/",
        "smith.vcf",
        vcard("Alice Smith", "uid-smith"),
    );

    let headers = RequestHeaders::new("/ab/alice/contacts/");
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("Smith"), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.root_status, None);
    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.nodes[0].href(), "/ab/alice/contacts/smith.vcf");
}

#[tokio::test]
async fn query_over_limit_keeps_collected_nodes() {
    let (server, dir) = seeded();
    dir.seed_card("/ab/alice/contacts/", "s1.vcf", vcard("Smith One", "uid-1"));
    dir.seed_card("/ab/alice/contacts/", "s2.vcf", vcard("Smith Two", "uid-2"));
    dir.seed_card("/ab/alice/contacts/", "s3.vcf", vcard("Smith Three", "uid-3"));

    let headers = RequestHeaders::new("/ab/alice/contacts/");
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("Smith"), Some(2)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.root_status, Some(StatusCode::INSUFFICIENT_STORAGE));
    assert_eq!(result.nodes.len(), 2);
}

#[tokio::test]
async fn query_traverses_collections_depth_first() {
    let (server, dir) = seeded();
    dir.seed_card(
        "/ab/alice/contacts/",
        "smith.vcf",
        vcard("Alice Smith", "uid-smith"),
    );

    // Depth-limited traversal from a folder two levels up.
    let headers = RequestHeaders::new("/ab/").with_depth(Depth::Infinity);
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("Smith"), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.nodes[0].href(), "/ab/alice/contacts/smith.vcf");

    // Without a depth the report affects the root only; the subtree is out
    // of reach and the branch yields an empty result, not an error.
    let headers = RequestHeaders::new("/ab/");
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("Smith"), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(result.nodes.is_empty());
    assert_eq!(result.root_status, None);
}

#[tokio::test]
async fn query_aimed_at_a_card_returns_it_unfiltered() {
    let (server, _dir) = seeded();

    let headers = RequestHeaders::new("/ab/alice/contacts/bob.vcf");
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("does-not-match"), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.nodes[0].href(), "/ab/alice/contacts/bob.vcf");
}

#[tokio::test]
async fn query_propagates_the_server_cap() {
    let (server, dir) = seeded();
    dir.seed_card("/ab/alice/contacts/", "s1.vcf", vcard("Smith One", "uid-1"));
    dir.seed_card("/ab/alice/contacts/", "s2.vcf", vcard("Smith Two", "uid-2"));
    dir.state.lock().server_cap = Some(1);

    let headers = RequestHeaders::new("/ab/alice/contacts/");
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("Smith"), None),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.root_status, Some(StatusCode::INSUFFICIENT_STORAGE));
    assert_eq!(result.nodes.len(), 1);
}

#[tokio::test]
async fn multiget_isolates_failing_hrefs() {
    let (server, _dir) = seeded();

    let headers = RequestHeaders::new("/ab/alice/contacts/");
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            Report::AddressbookMultiGet(MultiGet {
                properties: PropFind::PropName,
                hrefs: vec![
                    "/ab/alice/contacts/bob.vcf".to_string(),
                    "/ab/alice/contacts/ghost.vcf".to_string(),
                    "/ab/nowhere/".to_string(),
                ],
            }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.nodes.len(), 3);
    assert_eq!(result.nodes[0].href(), "/ab/alice/contacts/bob.vcf");
    assert!(matches!(result.nodes[0], DavNode::Card { .. }));

    assert_eq!(result.nodes[1].status(), Some(StatusCode::NOT_FOUND));
    assert!(!result.nodes[1].is_collection());

    // Trailing slash types the placeholder as a collection.
    assert_eq!(result.nodes[2].status(), Some(StatusCode::NOT_FOUND));
    assert!(result.nodes[2].is_collection());
}

#[tokio::test]
async fn cancellation_yields_the_partial_result() {
    let (server, dir) = seeded();
    dir.seed_card(
        "/ab/alice/contacts/",
        "smith.vcf",
        vcard("Alice Smith", "uid-smith"),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let headers = RequestHeaders::new("/ab/").with_depth(Depth::Infinity);
    let result = server
        .handle_report_request(
            &token(),
            &headers,
            query_report(fn_contains("Smith"), None),
            &cancel,
        )
        .await
        .unwrap();
    assert!(result.nodes.is_empty());

    let result = server
        .handle_report_request(
            &token(),
            &headers,
            Report::AddressbookMultiGet(MultiGet {
                properties: PropFind::PropName,
                hrefs: vec!["/ab/alice/contacts/bob.vcf".to_string()],
            }),
            &cancel,
        )
        .await
        .unwrap();
    assert!(result.nodes.is_empty());
}

#[tokio::test]
async fn file_put_creates_and_folds_content_type_parts() {
    let (server, dir) = seeded();

    let headers = RequestHeaders::new("/ab/alice/attachments/photo.png").with_create();
    let result = server
        .handle_file_update(
            &token(),
            &headers,
            &["image/png", "charset=binary"],
            vec![1, 2, 3],
        )
        .await
        .unwrap();
    assert!(result.created);

    let state = dir.state.lock();
    let stored = &state.files[&(
        "/ab/alice/attachments/".to_string(),
        "photo.png".to_string(),
    )];
    assert_eq!(stored.content_type.as_deref(), Some("image/png;charset=binary"));
    assert_eq!(stored.content_length, 3);
}

#[tokio::test]
async fn file_put_checks_the_previous_etag() {
    let (server, dir) = seeded();
    dir.seed_file("/ab/alice/attachments/", "notes.txt", b"v1");

    // The stored revision is modified=clock, sequence=1.
    let etag = {
        let state = dir.state.lock();
        let file = &state.files[&(
            "/ab/alice/attachments/".to_string(),
            "notes.txt".to_string(),
        )];
        format!("\"{}-{}\"", file.modified, file.sequence)
    };

    let headers =
        RequestHeaders::new("/ab/alice/attachments/notes.txt").with_if_etag(etag.clone());
    server
        .handle_file_update(&token(), &headers, &["text/plain"], b"v2".to_vec())
        .await
        .unwrap();

    // The sequence moved on; the old tag no longer matches.
    let mutations = dir.mutation_count();
    let headers = RequestHeaders::new("/ab/alice/attachments/notes.txt").with_if_etag(etag);
    let err = server
        .handle_file_update(&token(), &headers, &["text/plain"], b"v3".to_vec())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(dir.mutation_count(), mutations);
}

#[tokio::test]
async fn get_fetches_cards_and_lazy_file_content() {
    let (server, dir) = seeded();
    dir.seed_file("/ab/alice/attachments/", "notes.txt", b"hello");

    let content = server
        .handle_get_request(&token(), &RequestHeaders::new("/ab/alice/contacts/bob.vcf"))
        .await
        .unwrap();
    match content {
        Content::Card { data, content_type } => {
            assert_eq!(content_type, "text/vcard");
            assert!(data.contains("BEGIN:VCARD"));
            assert!(data.contains("Bob Jones"));
        }
        other => panic!("expected card content, got {other:?}"),
    }

    let content = server
        .handle_get_request(
            &token(),
            &RequestHeaders::new("/ab/alice/attachments/notes.txt"),
        )
        .await
        .unwrap();
    match content {
        Content::File { bytes, .. } => assert_eq!(bytes, b"hello"),
        other => panic!("expected file content, got {other:?}"),
    }
}

#[tokio::test]
async fn get_collection_listing_respects_the_browsing_flag() {
    let (server, _dir) = seeded_with_config(CardDavConfig {
        directory_browsing_disallowed: true,
        ..Default::default()
    });
    let err = server
        .handle_get_request(&token(), &RequestHeaders::new("/ab/alice/"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let (server, _dir) = seeded();
    let content = server
        .handle_get_request(&token(), &RequestHeaders::new("/ab/alice/"))
        .await
        .unwrap();
    match content {
        Content::Collection { nodes } => {
            assert_eq!(nodes.len(), 2);
        }
        other => panic!("expected a listing, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_dispatches_by_node_kind() {
    let (server, dir) = seeded();
    dir.seed_file("/ab/alice/attachments/", "notes.txt", b"x");

    server
        .handle_delete_request(&token(), &RequestHeaders::new("/ab/alice/contacts/bob.vcf"))
        .await
        .unwrap();
    assert!(dir.state.lock().cards.is_empty());

    server
        .handle_delete_request(
            &token(),
            &RequestHeaders::new("/ab/alice/attachments/notes.txt"),
        )
        .await
        .unwrap();
    assert!(dir.state.lock().files.is_empty());

    server
        .handle_delete_request(&token(), &RequestHeaders::new("/ab/alice/attachments/"))
        .await
        .unwrap();
    assert!(!dir.state.lock().collections.contains_key("/ab/alice/attachments/"));

    let err = server
        .handle_delete_request(&token(), &RequestHeaders::new("/principals/users/alice"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_honors_if_match() {
    let (server, dir) = seeded();
    let mutations = dir.mutation_count();

    let headers =
        RequestHeaders::new("/ab/alice/contacts/bob.vcf").with_if_etag("\"stale\"");
    let err = server
        .handle_delete_request(&token(), &headers)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(dir.mutation_count(), mutations);
}

#[tokio::test]
async fn copy_requires_overwrite_for_existing_destinations() {
    let (server, dir) = seeded();
    dir.seed_card("/ab/alice/contacts/", "copy.vcf", vcard("Copy", "uid-copy"));

    let headers = RequestHeaders::new("/ab/alice/contacts/bob.vcf")
        .with_destination("/ab/alice/contacts/copy.vcf")
        .with_overwrite(false);
    let err = server
        .handle_copy_move_request(&token(), &headers, true)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);

    let headers = RequestHeaders::new("/ab/alice/contacts/bob.vcf")
        .with_destination("/ab/alice/contacts/bob2.vcf")
        .with_overwrite(false);
    let status = server
        .handle_copy_move_request(&token(), &headers, true)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    // Entity copies only accept depth 0.
    let headers = RequestHeaders::new("/ab/alice/contacts/bob.vcf")
        .with_destination("/ab/alice/contacts/bob3.vcf")
        .with_depth(Depth::Infinity);
    let err = server
        .handle_copy_move_request(&token(), &headers, true)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn handler_pool_reuses_handlers_per_key() {
    let dir = MemDirectory::new();
    dir.add_collection("/ab/", false);
    let makes = Arc::new(AtomicUsize::new(0));
    let handle = dir.clone();
    let make_counter = makes.clone();
    let server = Server::new(CardDavConfig::default(), move |_key: &HandlerKey| {
        make_counter.fetch_add(1, Ordering::SeqCst);
        Ok(handle.clone())
    });

    {
        let _first = server.directory("/ab/", &token()).unwrap();
    }
    {
        let _second = server.directory("/ab/", &token()).unwrap();
    }
    // Same key: one handler created, opened once per request.
    assert_eq!(makes.load(Ordering::SeqCst), 1);
    assert_eq!(dir.opens.load(Ordering::SeqCst), 2);

    {
        let _anonymous = server
            .directory("/ab/", &AccessToken::anonymous())
            .unwrap();
    }
    // A different account keys a different handler.
    assert_eq!(makes.load(Ordering::SeqCst), 2);
}
