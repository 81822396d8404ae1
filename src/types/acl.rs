//! Access control lists.

use super::{CannedAcl, Owner};

/// Group URI for all users.
pub const ALL_USERS_GROUP: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
/// Group URI for authenticated users.
pub const AUTHENTICATED_USERS_GROUP: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// Permission carried by a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// All permissions.
    FullControl,
    /// Read the resource.
    Read,
    /// Write the resource.
    Write,
    /// Read the ACL.
    ReadAcp,
    /// Write the ACL.
    WriteAcp,
}

impl Permission {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FullControl => "FULL_CONTROL",
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::ReadAcp => "READ_ACP",
            Permission::WriteAcp => "WRITE_ACP",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_CONTROL" => Ok(Permission::FullControl),
            "READ" => Ok(Permission::Read),
            "WRITE" => Ok(Permission::Write),
            "READ_ACP" => Ok(Permission::ReadAcp),
            "WRITE_ACP" => Ok(Permission::WriteAcp),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}

/// Recipient of a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grantee {
    /// A user identified by canonical ID.
    CanonicalUser {
        /// Canonical user ID.
        id: String,
        /// Display name.
        display_name: Option<String>,
    },
    /// A predefined group.
    Group {
        /// Group URI.
        uri: String,
    },
    /// A user identified by e-mail address.
    Email {
        /// E-mail address.
        address: String,
    },
}

impl Grantee {
    /// Grantee for a canonical user.
    pub fn user(id: impl Into<String>) -> Self {
        Grantee::CanonicalUser {
            id: id.into(),
            display_name: None,
        }
    }

    /// The all-users group.
    pub fn all_users() -> Self {
        Grantee::Group {
            uri: ALL_USERS_GROUP.to_string(),
        }
    }

    /// The authenticated-users group.
    pub fn authenticated_users() -> Self {
        Grantee::Group {
            uri: AUTHENTICATED_USERS_GROUP.to_string(),
        }
    }

    /// The `xsi:type` of this grantee.
    pub fn type_name(&self) -> &'static str {
        match self {
            Grantee::CanonicalUser { .. } => "CanonicalUser",
            Grantee::Group { .. } => "Group",
            Grantee::Email { .. } => "AmazonCustomerByEmail",
        }
    }
}

/// One permission granted to one grantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Grantee.
    pub grantee: Grantee,
    /// Permission.
    pub permission: Permission,
}

impl Grant {
    /// Create a grant.
    pub fn new(grantee: Grantee, permission: Permission) -> Self {
        Self {
            grantee,
            permission,
        }
    }
}

/// Full access control policy of a bucket or object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlList {
    /// Owner.
    pub owner: Owner,
    /// Grants.
    pub grants: Vec<Grant>,
}

impl AccessControlList {
    /// Create an empty policy for `owner`.
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            grants: Vec::new(),
        }
    }

    /// Add a grant.
    pub fn with_grant(mut self, grantee: Grantee, permission: Permission) -> Self {
        self.grants.push(Grant::new(grantee, permission));
        self
    }

    /// Whether the all-users group holds `permission`.
    pub fn is_public(&self, permission: Permission) -> bool {
        self.grants.iter().any(|g| {
            g.permission == permission
                && matches!(&g.grantee, Grantee::Group { uri } if uri == ALL_USERS_GROUP)
        })
    }
}

/// ACL to apply: a canned header or a full policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclSetting {
    /// Sent as `x-amz-acl`.
    Canned(CannedAcl),
    /// Sent as an `AccessControlPolicy` body.
    Policy(AccessControlList),
}

impl From<CannedAcl> for AclSetting {
    fn from(acl: CannedAcl) -> Self {
        AclSetting::Canned(acl)
    }
}

impl From<AccessControlList> for AclSetting {
    fn from(acl: AccessControlList) -> Self {
        AclSetting::Policy(acl)
    }
}
