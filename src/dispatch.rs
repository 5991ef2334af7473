//! Query dispatch
//!
//! [`ConfigurationManager`] is the frozen view of a [`Repository`]. All
//! queries, typed or raw, go through [`ConfigurationManager::query`], which
//! looks the category up in a map built once at freeze time and applies the
//! category's [`Policy`]:
//!
//! - `Direct`: a token is rejected, the whole category is returned
//! - `OptionalToken`: no token returns the whole category, a token runs the
//!   category's own search and returns one record
//! - `MandatoryToken`: a missing token is rejected before any search runs;
//!   the search may land in more than one category
//!
//! Every outcome passes through [`observe`].

use core::mem::size_of;

use heapless::FnvIndexMap;
use zerocopy::{FromBytes, IntoBytes};

use crate::category::{
    ArmObject, Category, CategoryId, Owned, Policy, Record, TokenSearch, WholeCategory,
};
use crate::config::DISPATCH_CAPACITY;
use crate::error::CmError;
use crate::records::{CacheInfo, ProcHierarchyInfo};
use crate::repository::{Cache, ProcHierarchy, Repository};
use crate::token::{Token, TokenRef};

/// Category key of the topology reference (processor node or cache)
pub const TOPOLOGY_REFERENCE: CategoryId = CategoryId::arm(ArmObject::CmRef);

/// Type-erased search: the matching record as a one-element view
pub type SearchFn = for<'a> fn(&'a Repository, Token) -> Option<RawDescriptor<'a>>;

/// Category map built at freeze time
pub(crate) type DispatchMap<'r> = FnvIndexMap<CategoryId, DispatchEntry<'r>, DISPATCH_CAPACITY>;

/// Resolved records as raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDescriptor<'r> {
    id: CategoryId,
    size: usize,
    count: usize,
    data: &'r [u8],
}

impl<'r> RawDescriptor<'r> {
    /// View over `records` of category `id`
    pub fn new<T: Record>(id: CategoryId, records: &'r [T]) -> Self {
        Self {
            id,
            size: size_of::<T>(),
            count: records.len(),
            data: records.as_bytes(),
        }
    }

    /// Category the records live in
    pub fn id(&self) -> CategoryId {
        self.id
    }

    /// Byte size of one record
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of records
    pub fn count(&self) -> usize {
        self.count
    }

    /// Record bytes, `size * count` long
    pub fn data(&self) -> &'r [u8] {
        self.data
    }

    /// Reinterpret as records of `T`
    ///
    /// Fails with `InvalidParameter` when the element size does not match.
    pub fn cast<T: Record>(self) -> Result<Descriptor<'r, T>, CmError> {
        if self.size != size_of::<T>() {
            return Err(CmError::InvalidParameter);
        }
        let records = <[T]>::ref_from_bytes(self.data).map_err(|_| CmError::InvalidParameter)?;
        Ok(Descriptor {
            id: self.id,
            records,
        })
    }
}

/// Resolved records of one category, typed
#[derive(Debug, Clone, Copy)]
pub struct Descriptor<'r, T> {
    id: CategoryId,
    records: &'r [T],
}

impl<'r, T: Record> Descriptor<'r, T> {
    /// Category the records live in
    pub fn id(&self) -> CategoryId {
        self.id
    }

    /// Number of records
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Byte size of one record
    pub fn size(&self) -> usize {
        size_of::<T>()
    }

    /// The records
    pub fn records(&self) -> &'r [T] {
        self.records
    }

    pub fn iter(&self) -> core::slice::Iter<'r, T> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&'r T> {
        self.records.first()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw form of this view
    pub fn raw(&self) -> RawDescriptor<'r> {
        RawDescriptor::new(self.id, self.records)
    }

    /// Members of `owner`'s group, in population order
    pub fn owned_by(self, owner: TokenRef) -> impl Iterator<Item = &'r T>
    where
        T: Owned,
    {
        self.records.iter().filter(move |record| record.owner() == owner)
    }
}

/// Referent of a topology reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyNode<'r> {
    Processor(&'r ProcHierarchyInfo),
    Cache(&'r CacheInfo),
}

/// One category in the dispatch map
#[derive(Clone, Copy)]
pub(crate) struct DispatchEntry<'r> {
    policy: Policy,
    /// Whole-category view; absent for search-only categories
    view: Option<RawDescriptor<'r>>,
    search: Option<SearchFn>,
}

/// Frozen, query-only view of a repository
pub struct ConfigurationManager<'r> {
    repo: &'r Repository,
    map: DispatchMap<'r>,
}

impl<'r> ConfigurationManager<'r> {
    pub(crate) fn new(repo: &'r Repository) -> Result<Self, CmError> {
        let mut map = DispatchMap::new();
        repo.register_all(&mut map)?;
        map.insert(
            TOPOLOGY_REFERENCE,
            DispatchEntry {
                policy: Policy::MandatoryToken,
                view: None,
                search: Some(search_topology),
            },
        )
        .map_err(|_| CmError::OutOfResources)?;

        log::debug!("configuration manager frozen, {} categories", map.len());
        Ok(Self { repo, map })
    }

    /// The repository behind this manager
    pub fn repository(&self) -> &'r Repository {
        self.repo
    }

    /// Resolve `(id, token)` under the category's policy
    pub fn query(&self, id: CategoryId, token: Option<Token>) -> Result<RawDescriptor<'r>, CmError> {
        let result = self.dispatch(id, token);
        observe(id, token, &result);
        result
    }

    /// Resolve a raw key and raw token (0 = no token) as received at the
    /// protocol boundary
    pub fn query_raw(&self, id: u32, token: usize) -> Result<RawDescriptor<'r>, CmError> {
        match CategoryId::from_raw(id) {
            Ok(id) => self.query(id, Token::new(token)),
            Err(err) => {
                log::debug!("query {:#010x}: {}", id, err);
                Err(err)
            }
        }
    }

    fn dispatch(&self, id: CategoryId, token: Option<Token>) -> Result<RawDescriptor<'r>, CmError> {
        let entry = self.map.get(&id).ok_or(CmError::NotFound)?;
        match (entry.policy, token) {
            (Policy::Direct, Some(_)) | (Policy::MandatoryToken, None) => {
                Err(CmError::InvalidParameter)
            }
            (_, None) => entry.view.ok_or(CmError::NotFound),
            (_, Some(token)) => entry
                .search
                .and_then(|search| search(self.repo, token))
                .ok_or(CmError::NotFound),
        }
    }

    /// Whole category `C`
    ///
    /// An empty category resolves with a count of zero.
    pub fn resolve_all<C: WholeCategory>(&self) -> Result<Descriptor<'r, C::Record>, CmError> {
        self.query(C::ID, None)?.cast()
    }

    /// The record of `C` named by `token`
    pub fn resolve_one<C: TokenSearch>(
        &self,
        token: Token,
    ) -> Result<Descriptor<'r, C::Record>, CmError> {
        self.query(C::ID, Some(token))?.cast()
    }

    /// The record of `C` named by `token`, by reference
    pub fn lookup<C: TokenSearch>(&self, token: Token) -> Result<&'r C::Record, CmError> {
        self.resolve_one::<C>(token)?.first().ok_or(CmError::NotFound)
    }

    /// The first record of a single-record category
    pub fn single<C: WholeCategory>(&self) -> Result<&'r C::Record, CmError> {
        self.resolve_all::<C>()?.first().ok_or(CmError::NotFound)
    }

    /// Resolve a topology reference to a processor node or a cache
    pub fn resolve_reference(&self, token: Token) -> Result<TopologyNode<'r>, CmError> {
        let raw = self.query(TOPOLOGY_REFERENCE, Some(token))?;
        if raw.id() == ProcHierarchy::ID {
            let node = raw.cast::<ProcHierarchyInfo>()?.first();
            node.map(TopologyNode::Processor).ok_or(CmError::NotFound)
        } else if raw.id() == Cache::ID {
            let cache = raw.cast::<CacheInfo>()?.first();
            cache.map(TopologyNode::Cache).ok_or(CmError::NotFound)
        } else {
            Err(CmError::InvalidParameter)
        }
    }
}

/// Add category `C` to the dispatch map
pub(crate) fn register<'r, C: Category>(
    repo: &'r Repository,
    map: &mut DispatchMap<'r>,
) -> Result<(), CmError> {
    let entry = DispatchEntry {
        policy: C::POLICY,
        view: Some(RawDescriptor::new(C::ID, C::records(repo))),
        search: C::search_fn(),
    };
    map.insert(C::ID, entry).map_err(|_| CmError::OutOfResources)?;
    Ok(())
}

/// Search one category for `token`
pub(crate) fn search_one<C: TokenSearch>(repo: &Repository, token: Token) -> Option<RawDescriptor<'_>> {
    let records = C::records(repo);
    let index = C::search(records, token)?;
    Some(RawDescriptor::new(C::ID, &records[index..=index]))
}

/// Topology references name processor nodes first, then caches
fn search_topology(repo: &Repository, token: Token) -> Option<RawDescriptor<'_>> {
    search_one::<ProcHierarchy>(repo, token).or_else(|| search_one::<Cache>(repo, token))
}

/// Observation point for every query outcome
pub fn observe(id: CategoryId, token: Option<Token>, result: &Result<RawDescriptor<'_>, CmError>) {
    let token = token.map_or(0, Token::get);
    match result {
        Ok(desc) => log::trace!(
            "query {} token {:#x}: {} x {} bytes from {}",
            id,
            token,
            desc.count(),
            desc.size(),
            desc.id()
        ),
        Err(err) => log::debug!("query {} token {:#x}: {}", id, token, err),
    }
}
