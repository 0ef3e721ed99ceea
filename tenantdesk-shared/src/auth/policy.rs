/// Role policy
///
/// The single permission table for the platform. Every handler names the
/// [`Action`] it is about to perform and the gate asks [`can_perform`];
/// nothing else compares roles.
///
/// | Role         | Own tenant                                | Other tenants |
/// |--------------|-------------------------------------------|---------------|
/// | super_admin  | everything                                | everything    |
/// | tenant_admin | everything except platform administration | nothing       |
/// | user         | projects, tasks, user listing, own profile| nothing       |
///
/// Platform administration means listing all tenants, changing a tenant's
/// status or quota ceilings, and granting the `super_admin` role.

use crate::models::user::Role;
use crate::quota::ResourceClass;

/// An operation a caller wants to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read the caller's own user record
    ReadSelf,

    ReadTenant,
    ListTenants,

    /// Change a tenant's name or subscription plan
    UpdateTenant,

    /// Change a tenant's status or override its quota ceilings
    AdministerTenant,

    /// Add a user with the given role
    AddUser(Role),
    ListUsers,

    /// Change profile fields (full name)
    UpdateUserProfile,

    /// Set a user's role to the given value
    ChangeUserRole(Role),

    /// Activate or deactivate a user
    ChangeUserStatus,
    DeleteUser,

    CreateProject,
    ReadProject,
    UpdateProject,
    DeleteProject,

    CreateTask,
    ReadTask,
    UpdateTask,
    DeleteTask,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ReadSelf => "read_self",
            Action::ReadTenant => "read_tenant",
            Action::ListTenants => "list_tenants",
            Action::UpdateTenant => "update_tenant",
            Action::AdministerTenant => "administer_tenant",
            Action::AddUser(_) => "add_user",
            Action::ListUsers => "list_users",
            Action::UpdateUserProfile => "update_user_profile",
            Action::ChangeUserRole(_) => "change_user_role",
            Action::ChangeUserStatus => "change_user_status",
            Action::DeleteUser => "delete_user",
            Action::CreateProject => "create_project",
            Action::ReadProject => "read_project",
            Action::UpdateProject => "update_project",
            Action::DeleteProject => "delete_project",
            Action::CreateTask => "create_task",
            Action::ReadTask => "read_task",
            Action::UpdateTask => "update_task",
            Action::DeleteTask => "delete_task",
        }
    }

    /// The quota-limited class this action creates, if any
    pub fn quota_class(&self) -> Option<ResourceClass> {
        match self {
            Action::AddUser(_) => Some(ResourceClass::Users),
            Action::CreateProject => Some(ResourceClass::Projects),
            _ => None,
        }
    }
}

/// Relationship between the caller and the resolved target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeFacts {
    /// Target resolves to the caller's own tenant
    pub same_tenant: bool,

    /// Target is the caller's own user record
    pub same_user: bool,
}

impl ScopeFacts {
    pub fn new(same_tenant: bool, same_user: bool) -> Self {
        Self {
            same_tenant,
            same_user,
        }
    }
}

/// Decides whether `role` may perform `action` on a target described by `facts`
///
/// Total over every input: there is no "undecided" outcome.
pub fn can_perform(role: Role, action: Action, facts: ScopeFacts) -> bool {
    match role {
        Role::SuperAdmin => true,

        Role::TenantAdmin => {
            facts.same_tenant
                && match action {
                    Action::ListTenants | Action::AdministerTenant => false,
                    Action::ReadSelf => facts.same_user,
                    Action::AddUser(granted) | Action::ChangeUserRole(granted) => {
                        granted != Role::SuperAdmin
                    }
                    Action::ReadTenant
                    | Action::UpdateTenant
                    | Action::ListUsers
                    | Action::UpdateUserProfile
                    | Action::ChangeUserStatus
                    | Action::DeleteUser
                    | Action::CreateProject
                    | Action::ReadProject
                    | Action::UpdateProject
                    | Action::DeleteProject
                    | Action::CreateTask
                    | Action::ReadTask
                    | Action::UpdateTask
                    | Action::DeleteTask => true,
                }
        }

        Role::User => {
            facts.same_tenant
                && match action {
                    Action::ReadSelf | Action::UpdateUserProfile => facts.same_user,
                    Action::ListUsers
                    | Action::CreateProject
                    | Action::ReadProject
                    | Action::UpdateProject
                    | Action::DeleteProject
                    | Action::CreateTask
                    | Action::ReadTask
                    | Action::UpdateTask
                    | Action::DeleteTask => true,
                    Action::ReadTenant
                    | Action::ListTenants
                    | Action::UpdateTenant
                    | Action::AdministerTenant
                    | Action::AddUser(_)
                    | Action::ChangeUserRole(_)
                    | Action::ChangeUserStatus
                    | Action::DeleteUser => false,
                }
        }
    }
}
