//! Role-linked profile handling for user updates.
//!
//! A user with role `adopter` or `pet_owner` owns one profile row linked by
//! username. Changing the role flags the old profile archived in place and
//! creates a profile for the new role; keeping the role syncs mutable fields
//! into the existing profile.

use serde::{Deserialize, Serialize};

use crate::models::{EntityKind, Role};

/// Full replacement values for a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub role: Role,
}

/// Profile work implied by moving a user from one role to another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfilePlan {
    /// Profile table whose row for the old username gets the in-place flag.
    pub flag_old: Option<EntityKind>,
    /// Profile table that receives a fresh row for the new role.
    pub create_new: Option<EntityKind>,
    /// Profile table whose live row receives the updated email.
    pub sync: Option<EntityKind>,
}

impl ProfilePlan {
    pub fn for_roles(from: Role, to: Role) -> Self {
        if from == to {
            return Self {
                sync: to.profile_kind(),
                ..Self::default()
            };
        }
        Self {
            flag_old: from.profile_kind(),
            create_new: to.profile_kind(),
            sync: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flag_old.is_none() && self.create_new.is_none() && self.sync.is_none()
    }
}

/// What a committed user update did to the linked profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum RoleTransition {
    Unchanged {
        synced_profile: Option<EntityKind>,
    },
    Changed {
        from: Role,
        to: Role,
        flagged_old_profile: Option<EntityKind>,
        created_profile: Option<EntityKind>,
    },
}

impl RoleTransition {
    pub fn from_plan(from: Role, to: Role, plan: ProfilePlan) -> Self {
        if from == to {
            RoleTransition::Unchanged {
                synced_profile: plan.sync,
            }
        } else {
            RoleTransition::Changed {
                from,
                to,
                flagged_old_profile: plan.flag_old,
                created_profile: plan.create_new,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_role_syncs_profile() {
        let plan = ProfilePlan::for_roles(Role::Adopter, Role::Adopter);
        assert_eq!(plan.sync, Some(EntityKind::Adopter));
        assert_eq!(plan.flag_old, None);
        assert_eq!(plan.create_new, None);
    }

    #[test]
    fn test_admin_unchanged_is_empty() {
        assert!(ProfilePlan::for_roles(Role::Admin, Role::Admin).is_empty());
    }

    #[test]
    fn test_adopter_to_pet_owner_flags_and_creates() {
        let plan = ProfilePlan::for_roles(Role::Adopter, Role::PetOwner);
        assert_eq!(plan.flag_old, Some(EntityKind::Adopter));
        assert_eq!(plan.create_new, Some(EntityKind::PetOwner));
        assert_eq!(plan.sync, None);
    }

    #[test]
    fn test_pet_owner_to_admin_only_flags() {
        let plan = ProfilePlan::for_roles(Role::PetOwner, Role::Admin);
        assert_eq!(plan.flag_old, Some(EntityKind::PetOwner));
        assert_eq!(plan.create_new, None);
    }

    #[test]
    fn test_admin_to_adopter_only_creates() {
        let plan = ProfilePlan::for_roles(Role::Admin, Role::Adopter);
        assert_eq!(plan.flag_old, None);
        assert_eq!(plan.create_new, Some(EntityKind::Adopter));
    }

    #[test]
    fn test_transition_from_plan() {
        let plan = ProfilePlan::for_roles(Role::Adopter, Role::Admin);
        let transition = RoleTransition::from_plan(Role::Adopter, Role::Admin, plan);
        assert_eq!(
            transition,
            RoleTransition::Changed {
                from: Role::Adopter,
                to: Role::Admin,
                flagged_old_profile: Some(EntityKind::Adopter),
                created_profile: None,
            }
        );

        let plan = ProfilePlan::for_roles(Role::PetOwner, Role::PetOwner);
        assert_eq!(
            RoleTransition::from_plan(Role::PetOwner, Role::PetOwner, plan),
            RoleTransition::Unchanged {
                synced_profile: Some(EntityKind::PetOwner)
            }
        );
    }
}
