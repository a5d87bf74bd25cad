use tracing::debug;

use crate::models::directive::{ClauseValue, ContainsClause, MatchRule};

/// Returns true when `rule` is satisfied by a message with this routing key
/// and body. A rule without clauses matches any body on its routing key.
pub fn matches(rule: &MatchRule, routing_key: &str, body: &str) -> bool {
    if rule.routing_key != routing_key {
        return false;
    }

    let clauses_found = rule
        .contains
        .iter()
        .all(|clause| clause_matches(clause, body));

    clauses_found && (rule.contains_string.is_empty() || body.contains(&rule.contains_string))
}

/// The exact byte sequence a clause looks for in the serialized body.
pub fn search_token(clause: &ContainsClause) -> String {
    match &clause.value {
        ClauseValue::String(s) => format!("\"{}\":\"{}\"", clause.key, s),
        ClauseValue::Number { value, decimals } => {
            format!("\"{}\":{:.*}", clause.key, *decimals, value)
        }
        ClauseValue::Bool(b) => format!("\"{}\":{}", clause.key, b),
    }
}

fn clause_matches(clause: &ContainsClause, body: &str) -> bool {
    let token = search_token(clause);

    match clause.value {
        ClauseValue::Number { .. } => contains_number_token(body, &token),
        _ => body.contains(&token),
    }
}

// A numeric token only counts when the number ends where the token ends.
fn contains_number_token(body: &str, token: &str) -> bool {
    body.match_indices(token).any(|(start, _)| {
        !matches!(
            body.as_bytes().get(start + token.len()),
            Some(b'0'..=b'9' | b'.' | b'e' | b'E')
        )
    })
}

/// Pending acknowledgment rules, consumed as messages satisfy them.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<MatchRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Finds the most recently listed rule satisfied by the message and
    /// removes it from the set. Each rule is consumed at most once.
    pub fn take_match(&mut self, routing_key: &str, body: &str) -> Option<MatchRule> {
        let index = (0..self.rules.len())
            .rev()
            .find(|&i| matches(&self.rules[i], routing_key, body))?;

        let rule = self.rules.remove(index);
        debug!(
            routing_key,
            remaining = self.rules.len(),
            "Directive rule consumed"
        );

        Some(rule)
    }
}
