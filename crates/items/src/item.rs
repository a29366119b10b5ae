use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use longhorn_core::value_object::required_text;
use longhorn_core::{timestamp, DomainError, DomainResult, Entity, ItemId, ValueObject};

/// Maximum item name length, in characters (matches the `items.name` column).
pub const NAME_MAX_CHARS: usize = 100;

/// Validated item name: non-blank, at most [`NAME_MAX_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemName(String);

impl ItemName {
    pub fn parse(value: String) -> DomainResult<Self> {
        required_text("Name", value, NAME_MAX_CHARS).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl ValueObject for ItemName {}

/// Entity: Item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Item {
    /// Rebuild an item from stored columns.
    pub fn restore(
        id: ItemId,
        name: String,
        description: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            created_at,
            updated_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a partial update.
    ///
    /// Fields absent from `changes` keep their value. `updated_at` is always
    /// refreshed and ends up strictly after its previous value, even if `at`
    /// is not.
    pub fn apply(&mut self, changes: &ItemChanges, at: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.as_str().to_string();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        self.updated_at = timestamp::after(self.updated_at, at);
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

/// An item that has passed validation but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: ItemName,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewItem {
    /// Validate creation input.
    ///
    /// `name` is required; `description` defaults to the empty string.
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.ok_or_else(|| DomainError::validation("Name is required"))?;
        Ok(Self {
            name: ItemName::parse(name)?,
            description: description.unwrap_or_default(),
            created_at,
        })
    }

    /// Attach the store-assigned id. `updated_at` starts equal to `created_at`.
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name.into_inner(),
            description: self.description,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Partial update of an item. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<ItemName>,
    pub description: Option<String>,
}

impl ItemChanges {
    pub fn new(name: Option<String>, description: Option<String>) -> DomainResult<Self> {
        Ok(Self {
            name: name.map(ItemName::parse).transpose()?,
            description,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn created(name: &str, description: Option<&str>) -> Item {
        NewItem::new(
            Some(name.to_string()),
            description.map(str::to_string),
            test_time(),
        )
        .unwrap()
        .into_item(ItemId::from_i64(1))
    }

    #[test]
    fn new_item_requires_name() {
        let err = NewItem::new(None, Some("x".to_string()), test_time()).unwrap_err();
        assert_eq!(err, DomainError::validation("Name is required"));
    }

    #[test]
    fn new_item_rejects_blank_name() {
        let err = NewItem::new(Some("  \t".to_string()), None, test_time()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for blank name"),
        }
    }

    #[test]
    fn new_item_rejects_overlong_name() {
        let name = "x".repeat(NAME_MAX_CHARS + 1);
        assert!(NewItem::new(Some(name), None, test_time()).is_err());
    }

    #[test]
    fn description_defaults_to_empty() {
        let item = created("Soil sample A", None);
        assert_eq!(item.name(), "Soil sample A");
        assert_eq!(item.description(), "");
        assert_eq!(item.id(), ItemId::from_i64(1));
    }

    #[test]
    fn created_item_has_equal_timestamps() {
        let item = created("Soil sample A", Some("core"));
        assert_eq!(item.created_at(), item.updated_at());
    }

    #[test]
    fn apply_changes_only_present_fields() {
        let mut item = created("Soil sample A", Some("core"));
        let changes = ItemChanges::new(None, Some("pH test".to_string())).unwrap();
        item.apply(&changes, test_time() + Duration::seconds(1));

        assert_eq!(item.name(), "Soil sample A");
        assert_eq!(item.description(), "pH test");
        assert!(item.updated_at() > item.created_at());
    }

    #[test]
    fn apply_with_stale_clock_still_advances() {
        let mut item = created("Soil sample A", None);
        let before = item.updated_at();
        item.apply(&ItemChanges::default(), test_time() - Duration::hours(1));
        assert!(item.updated_at() > before);
    }

    #[test]
    fn changes_reject_blank_name() {
        assert!(ItemChanges::new(Some(String::new()), None).is_err());
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(ItemChanges::new(None, None).unwrap().is_empty());
        assert!(!ItemChanges::new(None, Some(String::new())).unwrap().is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: a created item echoes its input and has equal timestamps.
            #[test]
            fn creation_echoes_input(
                name in "[A-Za-z][A-Za-z0-9 ]{0,99}",
                description in proptest::option::of("[ -~]{0,200}")
            ) {
                let item = NewItem::new(Some(name.clone()), description.clone(), test_time())
                    .unwrap()
                    .into_item(ItemId::from_i64(9));

                let expected_description = description.unwrap_or_default();
                prop_assert_eq!(item.name(), name.as_str());
                prop_assert_eq!(item.description(), expected_description.as_str());
                prop_assert_eq!(item.created_at(), item.updated_at());
            }

            /// Property: omitted fields keep their value; updated_at strictly increases.
            #[test]
            fn update_preserves_omitted_fields(
                new_name in proptest::option::of("[A-Za-z][A-Za-z0-9 ]{0,99}"),
                new_description in proptest::option::of("[ -~]{0,200}"),
                skew_secs in -60i64..60
            ) {
                let mut item = created("Original", Some("original description"));
                let before = item.clone();
                let changes = ItemChanges::new(new_name.clone(), new_description.clone()).unwrap();

                item.apply(&changes, test_time() + Duration::seconds(skew_secs));

                let expected_name = new_name.unwrap_or_else(|| before.name().to_string());
                let expected_description =
                    new_description.unwrap_or_else(|| before.description().to_string());
                prop_assert_eq!(item.name(), expected_name.as_str());
                prop_assert_eq!(item.description(), expected_description.as_str());
                prop_assert_eq!(item.created_at(), before.created_at());
                prop_assert!(item.updated_at() > before.updated_at());
            }
        }
    }
}
