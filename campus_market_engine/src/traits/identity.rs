use std::collections::HashSet;

use crate::db_types::Address;

/// Resolves the authenticated wallet behind an incoming request, e.g. from a session cookie.
/// Returns `None` for anonymous requests.
pub trait CallerIdentity<R> {
    fn resolve_caller_address(&self, request: &R) -> Option<Address>;
}

/// Answers whether an address may use the administrative endpoints.
pub trait AdminAllowList {
    fn is_admin(&self, address: &Address) -> bool;
}

/// An allow-list fixed at start-up, typically from `CMP_ADMIN_ADDRESSES`.
#[derive(Debug, Clone, Default)]
pub struct StaticAdminList {
    admins: HashSet<Address>,
}

impl StaticAdminList {
    pub fn new<I: IntoIterator<Item = Address>>(admins: I) -> Self {
        Self { admins: admins.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl AdminAllowList for StaticAdminList {
    fn is_admin(&self, address: &Address) -> bool {
        self.admins.contains(address)
    }
}
