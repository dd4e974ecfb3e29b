use serde::{Deserialize, Serialize};

/// A conversation discovered in the chat workspace.
///
/// Channels are re-discovered on every sync run and never persisted;
/// only the per-channel sync cursor survives between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub visibility: ChannelVisibility,
    pub is_member: bool,
}

impl Channel {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        visibility: ChannelVisibility,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            visibility,
            is_member: true,
        }
    }

    pub fn with_membership(mut self, is_member: bool) -> Self {
        self.is_member = is_member;
        self
    }
}

/// Visibility class of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelVisibility {
    Public,
    Private,
    Direct,
    Group,
}

impl ChannelVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelVisibility::Public => "public",
            ChannelVisibility::Private => "private",
            ChannelVisibility::Direct => "direct",
            ChannelVisibility::Group => "group",
        }
    }
}

impl std::fmt::Display for ChannelVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Listing class used when enumerating channels.
///
/// The platform groups public and private channels into one listing call;
/// direct and group conversations are listed separately. Enumeration walks
/// the classes in this order, paging each to exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelClass {
    PublicAndPrivate,
    Direct,
    Group,
}

impl ChannelClass {
    /// Discovery order for a full enumeration pass.
    pub const ALL: [ChannelClass; 3] = [
        ChannelClass::PublicAndPrivate,
        ChannelClass::Direct,
        ChannelClass::Group,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_membership() {
        let channel = Channel::new("C1", "general", ChannelVisibility::Public);
        assert!(channel.is_member);

        let left = channel.with_membership(false);
        assert!(!left.is_member);
    }

    #[test]
    fn test_class_order() {
        assert_eq!(ChannelClass::ALL[0], ChannelClass::PublicAndPrivate);
        assert_eq!(ChannelClass::ALL.len(), 3);
    }
}
