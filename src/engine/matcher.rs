//! Pure evaluation of a contact's notification rules against a check and
//! a severity at a point in time.

use std::collections::BTreeSet;

use crate::models::{Contact, Rule, Severity, Transport};

/// Resolves the transports to notify for one contact, given the check's
/// entity name and tags and the transition's severity and time.
///
/// A rule is applicable iff it matches the entity, matches the tags and
/// its time restriction (if any) is active. When any applicable rule is
/// specific (names an entity or tag), the general applicable rules are
/// discarded: the most specific rules win, including on blackhole — a
/// broad rule's blackhole never vetoes a specific rule's media, and a
/// specific blackhole silences the contact even when a general rule would
/// have notified. When no rule at all is applicable the synthesized
/// general rule applies, giving default-notify behaviour.
///
/// The result is intersected with the transports the contact actually has
/// media for.
pub fn resolve(
    contact: &Contact,
    entity_name: &str,
    check_tags: &BTreeSet<String>,
    severity: Severity,
    time: i64,
) -> BTreeSet<Transport> {
    let configured = contact.transports();
    if configured.is_empty() {
        return BTreeSet::new();
    }

    let timezone = contact.timezone();
    let fallback = synthesized_general(contact);

    let mut rules: Vec<&Rule> = contact.rules.iter().collect();
    if let Some(general) = fallback.as_ref() {
        rules.push(general);
    }

    let mut matchers: Vec<&Rule> = rules
        .into_iter()
        .filter(|rule| {
            rule.match_entity(entity_name)
                && rule.match_tags(check_tags)
                && rule.active_at(time, timezone)
        })
        .collect();

    if matchers.iter().any(|rule| rule.is_specific()) {
        matchers.retain(|rule| rule.is_specific());
    }

    if matchers.is_empty() || matchers.iter().any(|rule| rule.blackhole(severity)) {
        return BTreeSet::new();
    }

    let media: BTreeSet<Transport> =
        matchers.iter().flat_map(|rule| rule.media_for_severity(severity)).collect();

    media.intersection(&configured).copied().collect()
}

/// The general fallback rule guaranteed by the contact invariant,
/// synthesized when the contact does not carry one itself.
fn synthesized_general(contact: &Contact) -> Option<Rule> {
    if contact.rules.iter().any(|rule| rule.is_general()) {
        None
    } else {
        Some(Rule::general(contact.transports()))
    }
}
