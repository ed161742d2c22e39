//! Reasons why opening the message context menu may be aborted.

use crate::collaborators::MessageId;

/// Every way an open request can be silently rejected.
///
/// None of these are shown to the user; callers may log or ignore them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenMenuError {
    #[error("the gesture does not open a context menu here")]
    GestureIgnored,
    #[error("no message bubble found under the pointer")]
    NoBubble,
    #[error("the date separator bubble has no actionable message")]
    DateSeparator,
    #[error("the message bubble has no message ID")]
    ZeroMessageId,
    #[error("a context menu is already open")]
    AlreadyOpen,
    #[error("sponsored messages have no actions during bulk selection")]
    SponsoredDuringSelection,
    #[error("message {0} was not found")]
    MessageNotFound(MessageId),
}
