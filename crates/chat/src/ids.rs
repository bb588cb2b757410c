use std::fmt;

use uuid::Uuid;

// Every id is minted fresh from a v7 UUID, so an id is never handed out twice.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

define_id!(SessionId);
define_id!(MessageId);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn fresh_ids_do_not_repeat() {
        let ids = (0..1_000).map(|_| MessageId::new_v7()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn displays_as_hyphenated_uuid() {
        let id = MessageId::new_v7();
        let shown = id.to_string();
        assert_eq!(shown.len(), 36);
        assert_eq!(shown, id.0.hyphenated().to_string());
    }
}
