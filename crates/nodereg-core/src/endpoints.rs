//! # Endpoint Resolution
//!
//! Every node exposes two resources the update run reads: a version
//! descriptor and a services collection. Where they live depends on the shape
//! generation of the node's record:
//!
//! - [`LinkTable`]: the record carries `links`; the endpoints are the links
//!   whose relation is `version` and `collection`.
//! - [`UrlSuffix`]: the record carries a flat `url`; the endpoints are that
//!   URL suffixed with `version` and `services`.
//!
//! [`NodeRecord::addressing`] picks the resolver from the fields present,
//! preferring the link table when both are set.

use crate::models::{Link, NodeRecord};

/// The role a resolved endpoint plays for the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    /// The version descriptor: `{"version": "<semver>"}`.
    Version,

    /// The services collection: `{"services": [...]}`.
    Collection,
}

impl EndpointRole {
    /// Link relation naming this role in a link table.
    pub fn relation(&self) -> &'static str {
        match self {
            EndpointRole::Version => "version",
            EndpointRole::Collection => "collection",
        }
    }

    /// Path suffix naming this role under a flat base URL.
    pub fn path_suffix(&self) -> &'static str {
        match self {
            EndpointRole::Version => "version",
            EndpointRole::Collection => "services",
        }
    }
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointRole::Version => f.write_str("version"),
            EndpointRole::Collection => f.write_str("services"),
        }
    }
}

/// Resolves a node's endpoint for a given role.
pub trait ResolveEndpoint {
    /// The URL serving `role`, or `None` if the record does not advertise one.
    fn resolve(&self, role: EndpointRole) -> Option<String>;
}

/// Resolver over a newest-generation link table.
#[derive(Debug, Clone, Copy)]
pub struct LinkTable<'a> {
    links: &'a [Link],
}

impl<'a> LinkTable<'a> {
    pub fn new(links: &'a [Link]) -> Self {
        Self { links }
    }
}

impl ResolveEndpoint for LinkTable<'_> {
    fn resolve(&self, role: EndpointRole) -> Option<String> {
        self.links
            .iter()
            .find(|link| link.rel == role.relation())
            .map(|link| link.href.clone())
    }
}

/// Resolver over an oldest-generation flat base URL.
#[derive(Debug, Clone, Copy)]
pub struct UrlSuffix<'a> {
    base: &'a str,
}

impl<'a> UrlSuffix<'a> {
    pub fn new(base: &'a str) -> Self {
        Self { base }
    }
}

impl ResolveEndpoint for UrlSuffix<'_> {
    fn resolve(&self, role: EndpointRole) -> Option<String> {
        if self.base.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            role.path_suffix()
        ))
    }
}

/// The two resolved endpoints of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub version: String,
    pub collection: String,
}

/// Why a node's endpoints could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedEndpoint {
    /// The record has neither `links` nor `url`.
    NoAddress,

    /// The record's address does not advertise this role.
    MissingRole(EndpointRole),
}

impl std::fmt::Display for UnresolvedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedEndpoint::NoAddress => f.write_str("record has neither links nor url"),
            UnresolvedEndpoint::MissingRole(role) => {
                write!(f, "no '{}' endpoint advertised", role.relation())
            }
        }
    }
}

impl NodeRecord {
    /// The resolver matching this record's shape generation.
    pub fn addressing(&self) -> Option<Box<dyn ResolveEndpoint + '_>> {
        if let Some(links) = &self.links {
            return Some(Box::new(LinkTable::new(links)));
        }
        self.url
            .as_deref()
            .map(|url| Box::new(UrlSuffix::new(url)) as Box<dyn ResolveEndpoint + '_>)
    }

    /// Resolves both endpoints, or reports the first one missing.
    pub fn endpoints(&self) -> Result<Endpoints, UnresolvedEndpoint> {
        let resolver = self.addressing().ok_or(UnresolvedEndpoint::NoAddress)?;
        let lookup = |role: EndpointRole| {
            resolver
                .resolve(role)
                .ok_or(UnresolvedEndpoint::MissingRole(role))
        };
        Ok(Endpoints {
            version: lookup(EndpointRole::Version)?,
            collection: lookup(EndpointRole::Collection)?,
        })
    }
}
