use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{admin::Admin, participant::Participant};

/// Anyone who can hold a session: participants and admins.
pub trait User {
    /// The rights granted to sessions of this user type.
    const RIGHTS: Rights;
    /// The user's database ID.
    fn id(&self) -> i64;
}

/// Session privilege levels, serialised into the token as a bare integer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Participant = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Participant => "participant",
            Self::Admin => "admin",
        })
    }
}

impl User for Participant {
    const RIGHTS: Rights = Rights::Participant;

    fn id(&self) -> i64 {
        self.id
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> i64 {
        self.id
    }
}
