/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Address-book filter evaluation.
//!
//! Filters can be evaluated in-process against a parsed vCard or translated
//! into a parameterized backend predicate; both paths implement the same
//! semantics.

use calcard::{
    common::IanaString,
    vcard::{VCard, VCardEntry},
};
use dav_proto::schema::{
    MatchType,
    request::{Filter, FilterOp, FilterTest, PropFilter, TextMatch},
};

/// In-process filter evaluation. An empty filter matches everything; a
/// repeated property satisfies its test if any occurrence matches.
pub fn vcard_matches(vcard: &VCard, filter: &Filter) -> bool {
    if filter.is_empty() {
        return true;
    }

    match filter.test {
        FilterTest::AllOf => filter.props.iter().all(|pf| prop_filter_matches(vcard, pf)),
        FilterTest::AnyOf => filter.props.iter().any(|pf| prop_filter_matches(vcard, pf)),
    }
}

fn prop_filter_matches(vcard: &VCard, prop_filter: &PropFilter) -> bool {
    let mut entries = vcard.properties(&prop_filter.name);

    match &prop_filter.op {
        FilterOp::Exists => entries.next().is_some(),
        FilterOp::Undefined => entries.next().is_none(),
        FilterOp::TextMatch(text_match) => {
            entries.any(|entry| entry_matches(entry, text_match))
        }
    }
}

fn entry_matches(entry: &VCardEntry, text_match: &TextMatch) -> bool {
    entry
        .values
        .iter()
        .filter_map(|value| value.as_text())
        .any(|value| text_matches(text_match, value))
}

fn text_matches(text_match: &TextMatch, value: &str) -> bool {
    let matched = if text_match.is_caseless() {
        // Caseless comparison upper-cases both sides.
        let value = value.to_uppercase();
        let target = text_match.value.to_uppercase();
        compare(text_match.match_type, &value, &target)
    } else {
        compare(text_match.match_type, value, &text_match.value)
    };

    matched != text_match.negate
}

fn compare(match_type: MatchType, value: &str, target: &str) -> bool {
    match match_type {
        MatchType::Equals => value == target,
        MatchType::Contains => value.contains(target),
        MatchType::StartsWith => value.starts_with(target),
        MatchType::EndsWith => value.ends_with(target),
    }
}

/// A backend search predicate: an SQL-style clause over a property
/// name/value table with positional parameters. Values are always carried
/// as parameters, never inlined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchExpr {
    pub clause: String,
    pub params: Vec<String>,
}

/// Translate a filter into a backend predicate. Returns `None` for an
/// empty filter, which imposes no constraint.
pub fn translate(filter: &Filter) -> Option<SearchExpr> {
    if filter.is_empty() {
        return None;
    }

    let mut expr = SearchExpr::default();
    let joiner = match filter.test {
        FilterTest::AllOf => " and ",
        FilterTest::AnyOf => " or ",
    };

    expr.clause.push('(');
    for (index, prop_filter) in filter.props.iter().enumerate() {
        if index > 0 {
            expr.clause.push_str(joiner);
        }
        translate_prop_filter(prop_filter, &mut expr);
    }
    expr.clause.push(')');

    Some(expr)
}

fn translate_prop_filter(prop_filter: &PropFilter, expr: &mut SearchExpr) {
    let name = prop_filter.name.as_str();

    match &prop_filter.op {
        FilterOp::Exists => {
            expr.clause.push_str("props.name in (?)");
            expr.params.push(name.to_string());
        }
        FilterOp::Undefined => {
            expr.clause.push_str("props.name not in (?)");
            expr.params.push(name.to_string());
        }
        FilterOp::TextMatch(text_match) => {
            expr.clause.push_str("(props.name = ? and ");
            expr.params.push(name.to_string());

            let caseless = text_match.is_caseless();
            if caseless {
                expr.clause.push_str("upper(props.value)");
            } else {
                expr.clause.push_str("props.value");
            }

            let value = if caseless {
                text_match.value.to_uppercase()
            } else {
                text_match.value.clone()
            };

            match text_match.match_type {
                MatchType::Equals => {
                    expr.clause
                        .push_str(if text_match.negate { " <> ?" } else { " = ?" });
                    expr.params.push(value);
                }
                match_type => {
                    if text_match.negate {
                        expr.clause.push_str(" not");
                    }
                    expr.clause.push_str(" like ?");

                    let mut pattern = String::with_capacity(value.len() + 2);
                    if matches!(match_type, MatchType::Contains | MatchType::EndsWith) {
                        pattern.push('%');
                    }
                    pattern.push_str(&value);
                    if matches!(match_type, MatchType::Contains | MatchType::StartsWith) {
                        pattern.push('%');
                    }
                    expr.params.push(pattern);
                }
            }

            expr.clause.push(')');
        }
    }
}
