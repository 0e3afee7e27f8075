use serenity::all::{Member, Permissions, RoleId};

/// Check if a member has admin-level permissions.
pub fn is_admin(member: &Member) -> bool {
    let perms = member.permissions.unwrap_or(Permissions::empty());
    perms.administrator()
}

/// Check if a member may manage events. With no role configured, falls back
/// to the administrator permission.
pub fn is_event_admin(member: &Member, admin_role: Option<RoleId>) -> bool {
    match admin_role {
        Some(role) => member.roles.contains(&role),
        None => is_admin(member),
    }
}
