//! Transaction categorization
//!
//! Suggestions come from a [`CategorySuggester`], the seam where an external
//! text-completion service would plug in. [`KeywordSuggester`] is the built-in
//! implementation. Whatever the suggester does, [`suggest`] never fails: any
//! error degrades to the fixed `uncategorized/other` result.

use crate::types::{CategorySuggestion, CategoryUpdate, LedgerError, Transaction};

/// Confidence reported when no real suggestion is available
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Maximum number of tags kept on a transaction
pub const MAX_TAGS: usize = 10;

/// Source of category suggestions
pub trait CategorySuggester: Send + Sync {
    fn suggest(&self, transaction: &Transaction) -> Result<CategorySuggestion, LedgerError>;
}

/// Matches description keywords against a fixed table
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSuggester;

const KEYWORDS: &[(&str, &str, &str)] = &[
    ("grocery", "food", "groceries"),
    ("supermarket", "food", "groceries"),
    ("restaurant", "food", "dining"),
    ("coffee", "food", "dining"),
    ("rent", "housing", "rent"),
    ("mortgage", "housing", "mortgage"),
    ("electric", "utilities", "electricity"),
    ("power", "utilities", "electricity"),
    ("water", "utilities", "water"),
    ("internet", "utilities", "internet"),
    ("phone", "utilities", "phone"),
    ("fuel", "transport", "fuel"),
    ("uber", "transport", "rideshare"),
    ("airline", "travel", "flights"),
    ("hotel", "travel", "lodging"),
    ("salary", "income", "salary"),
    ("payroll", "income", "salary"),
    ("loan", "income", "loan"),
    ("crypto", "investments", "crypto"),
    ("tuition", "education", "tuition"),
    ("pharmacy", "health", "pharmacy"),
];

impl CategorySuggester for KeywordSuggester {
    fn suggest(&self, transaction: &Transaction) -> Result<CategorySuggestion, LedgerError> {
        let description = transaction.description.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _, _)| description.contains(keyword))
            .map(|(_, category, subcategory)| CategorySuggestion {
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                confidence: 0.8,
            })
            .ok_or_else(|| LedgerError::not_found("category keyword", &transaction.description))
    }
}

pub fn fallback_suggestion() -> CategorySuggestion {
    CategorySuggestion {
        category: "uncategorized".to_string(),
        subcategory: "other".to_string(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Ask `suggester` for a category, degrading to the fallback on any error
pub fn suggest(suggester: &dyn CategorySuggester, transaction: &Transaction) -> CategorySuggestion {
    match suggester.suggest(transaction) {
        Ok(suggestion) => suggestion,
        Err(error) => {
            tracing::debug!(
                transaction = transaction.id,
                %error,
                "category suggestion unavailable"
            );
            fallback_suggestion()
        }
    }
}

/// Trim and validate a categorization update
pub fn normalize_update(update: CategoryUpdate) -> Result<CategoryUpdate, LedgerError> {
    let category = update.category.trim().to_string();
    if category.is_empty() {
        return Err(LedgerError::validation("category", "must not be empty"));
    }

    let tags: Vec<String> = update
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > MAX_TAGS {
        return Err(LedgerError::validation(
            "tags",
            format!("at most {} tags are allowed", MAX_TAGS),
        ));
    }

    let trimmed = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(CategoryUpdate {
        category,
        subcategory: trimmed(update.subcategory),
        tags,
        notes: trimmed(update.notes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, TransactionStatus, TransactionType};
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal::Decimal;

    struct Unavailable;

    impl CategorySuggester for Unavailable {
        fn suggest(&self, _: &Transaction) -> Result<CategorySuggestion, LedgerError> {
            Err(LedgerError::internal("service timed out"))
        }
    }

    fn tx(description: &str) -> Transaction {
        Transaction {
            id: 1,
            account_id: 1,
            amount: Decimal::new(1000, 2),
            tx_type: TransactionType::Withdrawal,
            direction: Direction::Debit,
            status: TransactionStatus::Completed,
            description: description.to_string(),
            reference: "REF".to_string(),
            from_account: None,
            to_account: None,
            conversion: None,
            category: None,
            subcategory: None,
            tags: Vec::new(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case("Weekly Grocery run", "food", "groceries")]
    #[case("Bill payment to City Power", "utilities", "electricity")]
    #[case("March rent", "housing", "rent")]
    fn test_keyword_suggestions(
        #[case] description: &str,
        #[case] category: &str,
        #[case] sub: &str,
    ) {
        let suggestion = suggest(&KeywordSuggester, &tx(description));
        assert_eq!(suggestion.category, category);
        assert_eq!(suggestion.subcategory, sub);
    }

    #[test]
    fn test_unknown_description_falls_back() {
        assert_eq!(suggest(&KeywordSuggester, &tx("misc")), fallback_suggestion());
    }

    #[test]
    fn test_failing_service_falls_back() {
        let suggestion = suggest(&Unavailable, &tx("grocery"));
        assert_eq!(suggestion.category, "uncategorized");
        assert_eq!(suggestion.subcategory, "other");
        assert_eq!(suggestion.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_normalize_update_trims() {
        let update = normalize_update(CategoryUpdate {
            category: "  food ".to_string(),
            subcategory: Some("  ".to_string()),
            tags: vec![" weekly ".to_string(), "".to_string()],
            notes: Some(" note ".to_string()),
        })
        .unwrap();

        assert_eq!(update.category, "food");
        assert_eq!(update.subcategory, None);
        assert_eq!(update.tags, vec!["weekly".to_string()]);
        assert_eq!(update.notes.as_deref(), Some("note"));
    }

    #[rstest]
    #[case::empty_category(CategoryUpdate { category: " ".to_string(), ..Default::default() })]
    #[case::too_many_tags(CategoryUpdate {
        category: "food".to_string(),
        tags: (0..11).map(|i| format!("t{}", i)).collect(),
        ..Default::default()
    })]
    fn test_normalize_update_rejects(#[case] update: CategoryUpdate) {
        assert!(matches!(normalize_update(update), Err(LedgerError::Validation { .. })));
    }
}
