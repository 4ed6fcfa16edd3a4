//! Gmail message types and header helpers.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};

/// An id pair from the message listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRef {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

/// A fetched inbox message. Read-only apart from its UNREAD label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub thread_id: String,
    /// Raw `From` header, e.g. `"HR" <hr@acme.com>`.
    pub from: String,
    /// Raw `To` header.
    pub to: String,
    pub subject: String,
    pub snippet: String,
    pub received_at: DateTime<Utc>,
}

impl EmailMessage {
    /// Bare sender address, lowercased.
    pub fn sender_address(&self) -> Option<String> {
        extract_addresses(&self.from).into_iter().next()
    }

    /// Domain part of the sender address.
    pub fn sender_domain(&self) -> Option<String> {
        self.sender_address()
            .and_then(|addr| domain_of(&addr).map(str::to_string))
    }

    /// Whether `recipient` appears among the `To` addresses.
    pub fn is_addressed_to(&self, recipient: &str) -> bool {
        let recipient = recipient.to_lowercase();
        let addresses = extract_addresses(&self.to);
        if addresses.is_empty() {
            return self.to.to_lowercase().contains(&recipient);
        }
        addresses.iter().any(|a| *a == recipient)
    }
}

/// Domain part of a bare address; `None` if there is no `@` or nothing after it.
pub fn domain_of(address: &str) -> Option<&str> {
    let (_, domain) = address.rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('>');
    if domain.is_empty() { None } else { Some(domain) }
}

/// Extract the bare addresses from an address header value, lowercased.
///
/// Handles `Name <a@b>`, `<a@b>`, bare `a@b` and comma-separated lists.
pub fn extract_addresses(header_value: &str) -> Vec<String> {
    let raw = format!("To: {}\r\n\r\n", header_value.trim());
    let parsed = MessageParser::default()
        .parse(raw.as_bytes())
        .and_then(|message| {
            message.to().map(|addr| match addr {
                mail_parser::Address::List(addrs) => addrs
                    .iter()
                    .filter_map(|a| a.address.as_ref().map(|s| s.to_lowercase()))
                    .collect::<Vec<_>>(),
                mail_parser::Address::Group(groups) => groups
                    .iter()
                    .flat_map(|g| {
                        g.addresses
                            .iter()
                            .filter_map(|a| a.address.as_ref().map(|s| s.to_lowercase()))
                    })
                    .collect(),
            })
        })
        .unwrap_or_default();

    if !parsed.is_empty() {
        return parsed;
    }

    // Fallback for values mail-parser refuses: take `<...>` or the bare token.
    header_value
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            let candidate = match (part.find('<'), part.rfind('>')) {
                (Some(start), Some(end)) if end > start => &part[start + 1..end],
                _ => part,
            };
            let candidate = candidate.trim();
            candidate.contains('@').then(|| candidate.to_lowercase())
        })
        .collect()
}

/// Decode the HTML entities Gmail puts in snippets.
pub fn unescape_snippet(snippet: &str) -> String {
    snippet
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
