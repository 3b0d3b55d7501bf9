#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    SuperAdmin = 1,
    Admin = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::SuperAdmin),
            2 => Some(Role::Admin),
            _ => None,
        }
    }
}
