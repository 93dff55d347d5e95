use crate::model::common::role::Role;

/// A capability a route may demand of its caller.
///
/// Routes name the capability in their [`AuthToken`](super::AuthToken) guard,
/// and the guard checks it once against the caller's role.
pub trait Capability {
    /// Human-readable name, used in error messages.
    const NAME: &'static str;

    /// Does a user with the given role have this capability?
    fn permits(role: Role) -> bool;
}

/// Any signed-in user: voters, and admins acting as voters.
#[derive(Debug)]
pub struct Voter;

impl Capability for Voter {
    const NAME: &'static str = "voter";

    fn permits(_role: Role) -> bool {
        true
    }
}

/// Signed-in admins only.
#[derive(Debug)]
pub struct Admin;

impl Capability for Admin {
    const NAME: &'static str = "admin";

    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}
