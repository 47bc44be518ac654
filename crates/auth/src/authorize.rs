//! Access policy: who may do what, and which records a list may show.
//!
//! - No IO
//! - No panics
//! - One table, matched exhaustively on [`Role`]

use serde::Serialize;

use taskboard_core::{TaskField, TaskPatch, TaskStatus, UserId};

use crate::Role;

/// Kind of resource an action targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
    Task,
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ResourceKind::User => f.write_str("user"),
            ResourceKind::Project => f.write_str("project"),
            ResourceKind::Task => f.write_str("task"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    List,
    Update,
    Delete,
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Action::Create => f.write_str("create"),
            Action::List => f.write_str("list"),
            Action::Update => f.write_str("update"),
            Action::Delete => f.write_str("delete"),
        }
    }
}

/// The resource an action targets, with the ownership facts the table needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resource {
    User,
    Project,
    /// `assigned_to` is the current assignee of the targeted task; `None` when
    /// the task is unassigned, not yet created, or does not exist.
    Task { assigned_to: Option<UserId> },
}

impl Resource {
    /// A task resource for actions where ownership is irrelevant.
    pub fn any_task() -> Self {
        Resource::Task { assigned_to: None }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::User => ResourceKind::User,
            Resource::Project => ResourceKind::Project,
            Resource::Task { .. } => ResourceKind::Task,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// The role may never perform this action on this resource kind.
    InsufficientRole {
        role: Role,
        action: Action,
        resource: ResourceKind,
    },
    /// The role may act only on tasks assigned to the actor.
    NotAssignee,
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DenyReason::InsufficientRole {
                role,
                action,
                resource,
            } => write!(f, "role {role} cannot {action} {resource} records"),
            DenyReason::NotAssignee => f.write_str("you cannot update this task"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Decide whether `role`/`actor_id` may perform `action` on `resource`.
///
/// Only the actor's role and id are consulted; callers pass the role from a
/// verified session claim.
pub fn authorize(role: Role, actor_id: UserId, action: Action, resource: Resource) -> Decision {
    let insufficient = || {
        Decision::Deny(DenyReason::InsufficientRole {
            role,
            action,
            resource: resource.kind(),
        })
    };

    match (resource, action) {
        // Listing is open to every role; what each role sees is narrowed by
        // the scope filters below.
        (_, Action::List) => Decision::Allow,

        (Resource::User, Action::Create) => match role {
            Role::Admin | Role::Manager => Decision::Allow,
            Role::Member => insufficient(),
        },
        // No identity is ever edited or removed through the API.
        (Resource::User, Action::Update | Action::Delete) => insufficient(),

        (Resource::Project, Action::Create | Action::Update | Action::Delete) => match role {
            Role::Admin | Role::Manager => Decision::Allow,
            Role::Member => insufficient(),
        },

        (Resource::Task { .. }, Action::Create | Action::Delete) => match role {
            Role::Admin | Role::Manager => Decision::Allow,
            Role::Member => insufficient(),
        },
        (Resource::Task { assigned_to }, Action::Update) => match role {
            Role::Admin | Role::Manager => Decision::Allow,
            Role::Member if assigned_to == Some(actor_id) => Decision::Allow,
            Role::Member => Decision::Deny(DenyReason::NotAssignee),
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scope filters
// ─────────────────────────────────────────────────────────────────────────────

/// Which identities a user listing may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    /// Everyone except holders of these roles.
    ExcludingRoles(&'static [Role]),
    /// Only the actor's own record.
    OnlySelf(UserId),
}

impl UserScope {
    pub fn permits(&self, id: UserId, role: Role) -> bool {
        match self {
            UserScope::ExcludingRoles(excluded) => !excluded.contains(&role),
            UserScope::OnlySelf(me) => *me == id,
        }
    }
}

pub fn user_scope(role: Role, actor_id: UserId) -> UserScope {
    match role {
        Role::Admin => UserScope::ExcludingRoles(&[Role::Admin]),
        Role::Manager => UserScope::ExcludingRoles(&[Role::Admin, Role::Manager]),
        Role::Member => UserScope::OnlySelf(actor_id),
    }
}

/// Filters a client asked for on a task listing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
}

/// Which tasks a task listing may contain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskScope {
    /// All tasks, optionally narrowed by the caller's own filters.
    Filtered(TaskQuery),
    /// Only tasks assigned to this identity; caller filters are discarded.
    AssignedTo(UserId),
}

impl TaskScope {
    pub fn permits(&self, assigned_to: Option<UserId>, status: TaskStatus) -> bool {
        match self {
            TaskScope::Filtered(q) => {
                q.status.is_none_or(|s| s == status)
                    && q.assigned_to.is_none_or(|a| Some(a) == assigned_to)
            }
            TaskScope::AssignedTo(me) => assigned_to == Some(*me),
        }
    }

    /// Status constraint, for back-ends that push filtering into queries.
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            TaskScope::Filtered(q) => q.status,
            TaskScope::AssignedTo(_) => None,
        }
    }

    /// Assignee constraint, for back-ends that push filtering into queries.
    pub fn assigned_to(&self) -> Option<UserId> {
        match self {
            TaskScope::Filtered(q) => q.assigned_to,
            TaskScope::AssignedTo(me) => Some(*me),
        }
    }
}

/// Narrow a task listing. For members the policy, not the caller, decides.
pub fn task_scope(role: Role, actor_id: UserId, requested: TaskQuery) -> TaskScope {
    match role {
        Role::Admin | Role::Manager => TaskScope::Filtered(requested),
        Role::Member => TaskScope::AssignedTo(actor_id),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field allow-lists
// ─────────────────────────────────────────────────────────────────────────────

/// Task fields `role` may change once an update is authorized.
pub fn mutable_task_fields(role: Role) -> &'static [TaskField] {
    match role {
        Role::Admin | Role::Manager => &TaskField::ALL,
        Role::Member => &[TaskField::Status],
    }
}

/// Strip every change `role` may not make. Disallowed fields are dropped
/// silently rather than failing the request.
pub fn restrict_task_patch(role: Role, patch: TaskPatch) -> TaskPatch {
    patch.retain_fields(mutable_task_fields(role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use taskboard_core::ProjectId;

    use Action::*;
    use Role::*;

    fn allowed(role: Role, action: Action, resource: Resource) -> bool {
        authorize(role, UserId::new(), action, resource).is_allowed()
    }

    #[test]
    fn user_rules() {
        assert!(allowed(Admin, Create, Resource::User));
        assert!(allowed(Manager, Create, Resource::User));
        assert!(!allowed(Member, Create, Resource::User));

        for role in Role::ALL {
            assert!(allowed(role, List, Resource::User));
            assert!(!allowed(role, Update, Resource::User));
            assert!(!allowed(role, Delete, Resource::User));
        }
    }

    #[test]
    fn project_rules() {
        for action in [Create, Update, Delete] {
            assert!(allowed(Admin, action, Resource::Project));
            assert!(allowed(Manager, action, Resource::Project));
            assert_eq!(
                authorize(Member, UserId::new(), action, Resource::Project),
                Decision::Deny(DenyReason::InsufficientRole {
                    role: Member,
                    action,
                    resource: ResourceKind::Project,
                })
            );
        }
        for role in Role::ALL {
            assert!(allowed(role, List, Resource::Project));
        }
    }

    #[test]
    fn task_create_list_delete_rules() {
        for action in [Create, Delete] {
            assert!(allowed(Admin, action, Resource::any_task()));
            assert!(allowed(Manager, action, Resource::any_task()));
            assert!(!allowed(Member, action, Resource::any_task()));
        }
        for role in Role::ALL {
            assert!(allowed(role, List, Resource::any_task()));
        }
    }

    #[test]
    fn members_cannot_delete_even_their_own_tasks() {
        let me = UserId::new();
        let decision = authorize(Member, me, Delete, Resource::Task { assigned_to: Some(me) });
        assert!(!decision.is_allowed());
    }

    #[test]
    fn task_update_rules() {
        let me = UserId::new();
        let someone = UserId::new();

        for role in [Admin, Manager] {
            for assigned_to in [None, Some(me), Some(someone)] {
                assert_eq!(
                    authorize(role, me, Update, Resource::Task { assigned_to }),
                    Decision::Allow
                );
            }
        }

        assert_eq!(
            authorize(Member, me, Update, Resource::Task { assigned_to: Some(me) }),
            Decision::Allow
        );
        assert_eq!(
            authorize(Member, me, Update, Resource::Task { assigned_to: Some(someone) }),
            Decision::Deny(DenyReason::NotAssignee)
        );
        // Unassigned or missing task: member is not the assignee.
        assert_eq!(
            authorize(Member, me, Update, Resource::Task { assigned_to: None }),
            Decision::Deny(DenyReason::NotAssignee)
        );
    }

    #[test]
    fn user_scopes() {
        let me = UserId::new();
        let other = UserId::new();

        let admin = user_scope(Admin, me);
        assert!(!admin.permits(other, Admin));
        assert!(!admin.permits(me, Admin));
        assert!(admin.permits(other, Manager));
        assert!(admin.permits(other, Member));

        let manager = user_scope(Manager, me);
        assert!(!manager.permits(other, Admin));
        assert!(!manager.permits(other, Manager));
        assert!(manager.permits(other, Member));

        let member = user_scope(Member, me);
        assert!(member.permits(me, Member));
        assert!(!member.permits(other, Member));
    }

    #[test]
    fn privileged_task_scope_honours_filters() {
        let me = UserId::new();
        let x = UserId::new();
        let scope = task_scope(
            Manager,
            me,
            TaskQuery {
                status: Some(TaskStatus::Done),
                assigned_to: Some(x),
            },
        );
        assert!(scope.permits(Some(x), TaskStatus::Done));
        assert!(!scope.permits(Some(x), TaskStatus::ToDo));
        assert!(!scope.permits(None, TaskStatus::Done));

        let unfiltered = task_scope(Admin, me, TaskQuery::default());
        assert!(unfiltered.permits(None, TaskStatus::InProgress));
    }

    #[test]
    fn member_task_scope_overrides_filters() {
        let me = UserId::new();
        let other = UserId::new();
        let scope = task_scope(
            Member,
            me,
            TaskQuery {
                status: Some(TaskStatus::Done),
                assigned_to: Some(other),
            },
        );
        assert_eq!(scope, TaskScope::AssignedTo(me));
        assert_eq!(scope.status(), None);
        assert_eq!(scope.assigned_to(), Some(me));
        assert!(scope.permits(Some(me), TaskStatus::ToDo));
        assert!(!scope.permits(Some(other), TaskStatus::Done));
    }

    #[test]
    fn member_patch_keeps_only_status() {
        let patch = TaskPatch {
            title: Some("x".into()),
            status: Some(TaskStatus::Done),
            project_id: Some(ProjectId::new()),
            ..TaskPatch::default()
        };
        let restricted = restrict_task_patch(Member, patch.clone());
        assert_eq!(restricted.status, Some(TaskStatus::Done));
        assert_eq!(restricted.title, None);
        assert_eq!(restricted.project_id, None);

        assert_eq!(restrict_task_patch(Manager, patch.clone()), patch);
    }

    #[test]
    fn deny_reasons_read_well() {
        let reason = DenyReason::InsufficientRole {
            role: Member,
            action: Delete,
            resource: ResourceKind::Task,
        };
        assert_eq!(reason.to_string(), "role Member cannot delete task records");
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Admin), Just(Manager), Just(Member)]
    }

    fn any_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::ToDo),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Done)
        ]
    }

    proptest! {
        #[test]
        fn member_scope_never_leaks_foreign_tasks(
            me in any::<u128>(),
            assignee in proptest::option::of(any::<u128>()),
            status in any_status(),
            requested_status in proptest::option::of(any_status()),
            requested_assignee in proptest::option::of(any::<u128>()),
        ) {
            let me = UserId::from_uuid(uuid::Uuid::from_u128(me));
            let assignee = assignee.map(|b| UserId::from_uuid(uuid::Uuid::from_u128(b)));
            let requested = TaskQuery {
                status: requested_status,
                assigned_to: requested_assignee.map(|b| UserId::from_uuid(uuid::Uuid::from_u128(b))),
            };
            let scope = task_scope(Member, me, requested);
            if scope.permits(assignee, status) {
                prop_assert_eq!(assignee, Some(me));
            }
        }

        #[test]
        fn non_privileged_non_assignee_is_always_denied(
            role in any_role(),
            same in any::<bool>(),
        ) {
            let me = UserId::new();
            let assignee = if same { me } else { UserId::new() };
            let decision = authorize(role, me, Update, Resource::Task { assigned_to: Some(assignee) });
            prop_assert_eq!(decision.is_allowed(), role.is_privileged() || same);
        }

        #[test]
        fn member_patch_never_changes_more_than_status(
            title in proptest::option::of(".{0,8}"),
            description in proptest::option::of(".{0,8}"),
            status in proptest::option::of(any_status()),
        ) {
            let patch = TaskPatch {
                title,
                description,
                status,
                assigned_to: Some(UserId::new()),
                project_id: Some(ProjectId::new()),
            };
            let restricted = restrict_task_patch(Member, patch);
            prop_assert_eq!(restricted, TaskPatch { status, ..TaskPatch::default() });
        }
    }
}
