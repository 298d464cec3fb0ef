//! # Caller Context
//!
//! Who is acting, on behalf of which tenant and branch.
//!
//! Insert and update queries read this to auto-seed audit columns. Every
//! field is optional and presence-checked only: a missing tenant simply
//! means no tenant column is seeded.

use serde::{Deserialize, Serialize};

/// Identity of the request that builds a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Tenant (company) id.
    pub tenant_id: Option<i64>,

    /// Branch id within the tenant.
    pub branch_id: Option<i64>,

    /// Login of the acting user.
    pub acting_user: Option<String>,

    /// Client IP address (recorded by the audit log only).
    pub ip: Option<String>,

    /// Client device description (recorded by the audit log only).
    pub device: Option<String>,
}

impl CallerContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant id.
    pub fn tenant(mut self, tenant_id: i64) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the branch id.
    pub fn branch(mut self, branch_id: i64) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    /// Sets the acting user.
    pub fn user(mut self, login: impl Into<String>) -> Self {
        self.acting_user = Some(login.into());
        self
    }

    /// Sets the client ip and device.
    pub fn client(mut self, ip: impl Into<String>, device: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self.device = Some(device.into());
        self
    }
}
