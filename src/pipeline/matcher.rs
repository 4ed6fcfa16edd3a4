//! Card matcher: find the Trello card an email belongs to.
//!
//! Two passes over the candidate cards, in collection order:
//! 1. `threadId: <id>` substring in the description
//! 2. `domain: <domain>` or `domain: [<domain>]`, case-insensitive
//!
//! No LLM involved; first hit wins.

use regex::Regex;
use tracing::{debug, warn};

use crate::trello::TrelloCard;

/// Why a card matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    ThreadId,
    Domain,
}

impl MatchReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::ThreadId => "thread_id",
            Self::Domain => "domain",
        }
    }
}

/// A matched card and its position in the candidate slice.
#[derive(Debug, Clone, Copy)]
pub struct CardMatch<'a> {
    pub index: usize,
    pub card: &'a TrelloCard,
    pub reason: MatchReason,
}

/// The description tag that links a card to a Gmail thread.
pub fn thread_tag(thread_id: &str) -> String {
    format!("threadId: {thread_id}")
}

/// Case-insensitive pattern for a `domain:` tag naming exactly `domain`.
///
/// The domain is matched literally (every metacharacter escaped) and must
/// not continue into a longer host name, so `acme.co` does not match
/// `domain: acme.com`.
pub fn domain_pattern(domain: &str) -> Result<Regex, regex::Error> {
    let d = regex::escape(domain.trim());
    Regex::new(&format!(
        r"(?im)(?:^|[^a-z])domain:[ \t]*(?:\[{d}\]|{d}(?:$|[^a-z0-9\-.]|\.(?:$|[^a-z0-9\-])))"
    ))
}

/// Find the card for an email, or `None` if nothing matches.
pub fn find_card<'a>(
    cards: &'a [TrelloCard],
    thread_id: &str,
    sender_domain: Option<&str>,
) -> Option<CardMatch<'a>> {
    if !thread_id.is_empty() {
        let tag = thread_tag(thread_id);
        if let Some((index, card)) = cards.iter().enumerate().find(|(_, c)| c.desc.contains(&tag)) {
            return Some(CardMatch {
                index,
                card,
                reason: MatchReason::ThreadId,
            });
        }
    }

    let domain = sender_domain.filter(|d| !d.trim().is_empty())?;
    let pattern = match domain_pattern(domain) {
        Ok(p) => p,
        Err(e) => {
            warn!(domain = %domain, error = %e, "Could not build domain pattern");
            return None;
        }
    };

    let mut hits = cards
        .iter()
        .enumerate()
        .filter(|(_, c)| pattern.is_match(&c.desc));
    let (index, card) = hits.next()?;

    let others = hits.count();
    if others > 0 {
        debug!(
            domain = %domain,
            chosen = %card.id,
            others,
            "Several cards carry the same domain tag; using the first"
        );
    }

    Some(CardMatch {
        index,
        card,
        reason: MatchReason::Domain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, desc: &str) -> TrelloCard {
        TrelloCard {
            id: id.into(),
            name: format!("Card {id}"),
            desc: desc.into(),
            id_list: "L_APPLIED".into(),
        }
    }

    #[test]
    fn thread_id_match_wins_over_domain() {
        let cards = vec![
            card("a", "domain: acme.com"),
            card("b", "Applied via site\nthreadId: 18c0abc"),
        ];
        let m = find_card(&cards, "18c0abc", Some("acme.com")).unwrap();
        assert_eq!(m.card.id, "b");
        assert_eq!(m.index, 1);
        assert_eq!(m.reason, MatchReason::ThreadId);
    }

    #[test]
    fn first_thread_match_in_collection_order() {
        let cards = vec![card("a", "threadId: t1"), card("b", "threadId: t1")];
        assert_eq!(find_card(&cards, "t1", None).unwrap().card.id, "a");
    }

    #[test]
    fn domain_match_plain_and_bracketed() {
        let plain = vec![card("a", "Notes\ndomain: acme.com\nmore")];
        let bracketed = vec![card("b", "domain: [acme.com]")];
        assert_eq!(
            find_card(&plain, "zzz", Some("acme.com")).unwrap().reason,
            MatchReason::Domain
        );
        assert_eq!(
            find_card(&bracketed, "zzz", Some("acme.com")).unwrap().card.id,
            "b"
        );
    }

    #[test]
    fn domain_match_is_case_insensitive() {
        let cards = vec![card("a", "Domain: ACME.com")];
        assert!(find_card(&cards, "", Some("acme.com")).is_some());
    }

    #[test]
    fn domain_dot_is_literal() {
        let cards = vec![card("a", "domain: acmexcom")];
        assert!(find_card(&cards, "", Some("acme.com")).is_none());
    }

    #[test]
    fn domain_metacharacters_are_escaped() {
        let cards = vec![card("a", "domain: a+b.io"), card("b", "domain: aab.io")];
        let m = find_card(&cards, "", Some("a+b.io")).unwrap();
        assert_eq!(m.card.id, "a");
    }

    #[test]
    fn domain_prefix_does_not_match_longer_host() {
        let cards = vec![card("a", "domain: acme.com"), card("b", "domain: acme.com.au")];
        assert!(find_card(&cards, "", Some("acme.co")).is_none());
        assert_eq!(find_card(&cards, "", Some("acme.com")).unwrap().card.id, "a");
        assert_eq!(
            find_card(&cards[1..], "", Some("acme.com")).map(|m| m.card.id.clone()),
            None
        );
    }

    #[test]
    fn domain_tag_at_end_of_sentence() {
        let cards = vec![card("a", "Recruiter uses domain: acme.com.")];
        assert!(find_card(&cards, "", Some("acme.com")).is_some());
    }

    #[test]
    fn subdomain_key_is_not_a_domain_tag() {
        let cards = vec![card("a", "subdomain: acme.com")];
        assert!(find_card(&cards, "", Some("acme.com")).is_none());
    }

    #[test]
    fn first_domain_match_in_collection_order() {
        let cards = vec![
            card("x", "nothing here"),
            card("a", "domain: acme.com"),
            card("b", "domain: [acme.com]"),
        ];
        let m = find_card(&cards, "", Some("acme.com")).unwrap();
        assert_eq!(m.card.id, "a");
        assert_eq!(m.index, 1);
    }

    #[test]
    fn no_domain_no_thread_match_is_none() {
        let cards = vec![card("a", "domain: acme.com")];
        assert!(find_card(&cards, "t9", None).is_none());
        assert!(find_card(&cards, "t9", Some("")).is_none());
        assert!(find_card(&[], "t9", Some("acme.com")).is_none());
    }

    #[test]
    fn thread_tag_format() {
        assert_eq!(thread_tag("abc"), "threadId: abc");
    }
}
