use chrono::Utc;
use url::Url;

use crate::collaborators::MessageId;

/// Returns the current time in milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A shareable link to a single message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageLink {
    pub url: Url,
    /// Private links only work for members of the chat.
    pub is_private: bool,
}

/// Builds a public link of the form `<base><username>/<post_id>`,
/// with an optional `?comment=<id>` for a message in a discussion thread.
pub fn public_message_link(
    base: &Url,
    username: &str,
    post_id: MessageId,
    comment: Option<MessageId>,
) -> Result<MessageLink, url::ParseError> {
    let mut url = base.join(&format!("{username}/{post_id}"))?;
    if let Some(comment) = comment {
        url.query_pairs_mut().append_pair("comment", &comment.to_string());
    }
    Ok(MessageLink { url, is_private: false })
}

/// Builds a private link of the form `<base>c/<chat_id>/<msg_id>`,
/// with an optional `?thread=<id>` for a message in a discussion thread.
pub fn private_message_link(
    base: &Url,
    chat_id: i64,
    msg_id: MessageId,
    thread: Option<MessageId>,
) -> Result<MessageLink, url::ParseError> {
    let mut url = base.join(&format!("c/{chat_id}/{msg_id}"))?;
    if let Some(thread) = thread {
        url.query_pairs_mut().append_pair("thread", &thread.to_string());
    }
    Ok(MessageLink { url, is_private: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://t.me/").unwrap()
    }

    #[test]
    fn public_links() {
        let link = public_message_link(&base(), "durov", 42, None).unwrap();
        assert_eq!(link.url.as_str(), "https://t.me/durov/42");
        assert!(!link.is_private);

        let link = public_message_link(&base(), "durov", 42, Some(7)).unwrap();
        assert_eq!(link.url.as_str(), "https://t.me/durov/42?comment=7");
    }

    #[test]
    fn private_links() {
        let link = private_message_link(&base(), 1234, 5, None).unwrap();
        assert_eq!(link.url.as_str(), "https://t.me/c/1234/5");
        assert!(link.is_private);

        let link = private_message_link(&base(), 1234, 5, Some(3)).unwrap();
        assert_eq!(link.url.as_str(), "https://t.me/c/1234/5?thread=3");
    }
}
