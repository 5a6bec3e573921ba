//! Balance aggregation over the transaction log
//!
//! Totals are recomputed from the full ledger on every read; nothing is cached.

use crate::db::{Participant, Transaction, UserId};
use crate::parser::normalize_amount;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Placeholder shown instead of an empty tree
pub const EMPTY_LEDGER: &str = "No expenses recorded yet.";

/// Total paid by one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerTotal {
    pub payer_id: UserId,
    pub name: String,
    pub total: Decimal,
}

/// Sum amounts per payer, ordered by descending total then ascending name.
///
/// Payers without a participant record have no display name and are left
/// out of the result.
pub fn compute_totals(transactions: &[Transaction], participants: &[Participant]) -> Vec<PayerTotal> {
    let names: HashMap<UserId, &str> = participants
        .iter()
        .map(|p| (p.id, p.display_name.as_str()))
        .collect();

    let mut sums: HashMap<UserId, Decimal> = HashMap::new();
    for tx in transactions {
        *sums.entry(tx.payer_id).or_default() += tx.amount;
    }

    let mut totals: Vec<PayerTotal> = sums
        .into_iter()
        .filter_map(|(payer_id, total)| match names.get(&payer_id) {
            Some(name) => Some(PayerTotal {
                payer_id,
                name: (*name).to_string(),
                total: normalize_amount(total),
            }),
            None => {
                tracing::debug!(payer_id, "Skipping payer without a participant record");
                None
            }
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.payer_id.cmp(&b.payer_id))
    });
    totals
}

/// Render totals as a box-drawing tree. Plain text; callers escape it for markup.
pub fn render_tree(totals: &[PayerTotal], currency: &str) -> String {
    if totals.is_empty() {
        return EMPTY_LEDGER.to_string();
    }

    let mut lines = vec!["Guild Ledger".to_string()];
    let last = totals.len() - 1;
    for (i, entry) in totals.iter().enumerate() {
        let branch = if i == last { "└──" } else { "├──" };
        lines.push(format!(
            "{branch} {}: {}",
            entry.name,
            format_money(entry.total, currency)
        ));
    }

    let grand_total: Decimal = totals.iter().map(|t| t.total).sum();
    lines.push(String::new());
    lines.push(format!("Total: {}", format_money(grand_total, currency)));
    lines.join("\n")
}

/// `$20.00` style rendering with exactly two decimals
pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{currency}{}", normalize_amount(amount))
}
