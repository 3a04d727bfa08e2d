//! Listing draft value, partial-update patches and merge rules.
//!
//! A [`ListingDraft`] is never edited in place by the editor: every change is
//! expressed as a [`ListingPatch`] and merged into a fresh value with
//! [`ListingDraft::apply`], so earlier drafts can be kept as undo snapshots.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::slug::slugify;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Currency of the asking price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Try,
    Usd,
    Eur,
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// One gallery image. Order in [`ListingDraft::images`] is display order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListingImage {
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

impl ListingImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: String::new(),
        }
    }
}

/// The editable value of a listing.
///
/// The `validate` attributes describe the required-field policy applied
/// before an explicit save; see [`crate::validation::validate_required`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ListingDraft {
    /// Human-readable listing title.
    pub title: String,
    /// URL identifier, derived from the title while empty.
    #[validate(length(min = 1))]
    pub slug: String,
    /// Classification, e.g. `"apartment"`, `"villa"`, `"land"`.
    #[validate(length(min = 1))]
    pub property_type: String,
    /// Free-form location (city / district / neighbourhood).
    #[validate(length(min = 1))]
    pub location: String,
    /// Asking price amount in `currency`.
    #[validate(required, range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    pub currency: Currency,
    pub description: String,
    pub images: Vec<ListingImage>,
    pub featured: bool,
    pub published: bool,
}

/// Prices compare bit-for-bit so a NaN loaded from outside still equals
/// itself and cannot defeat no-op detection in the undo history.
impl PartialEq for ListingDraft {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.slug == other.slug
            && self.property_type == other.property_type
            && self.location == other.location
            && self.price.map(f64::to_bits) == other.price.map(f64::to_bits)
            && self.currency == other.currency
            && self.description == other.description
            && self.images == other.images
            && self.featured == other.featured
            && self.published == other.published
    }
}

impl ListingDraft {
    /// Merge `patch` into a copy of this draft.
    ///
    /// When the resulting slug is empty and the patch carried a title, the
    /// slug is derived from that title. An explicitly set slug always wins.
    pub fn apply(&self, patch: &ListingPatch) -> ListingDraft {
        let mut next = self.clone();

        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(slug) = &patch.slug {
            next.slug = slug.clone();
        }
        if let Some(property_type) = &patch.property_type {
            next.property_type = property_type.clone();
        }
        if let Some(location) = &patch.location {
            next.location = location.clone();
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(currency) = patch.currency {
            next.currency = currency;
        }
        if let Some(description) = &patch.description {
            next.description = description.clone();
        }
        if let Some(images) = &patch.images {
            next.images = images.clone();
        }
        if let Some(featured) = patch.featured {
            next.featured = featured;
        }
        if let Some(published) = patch.published {
            next.published = published;
        }

        if next.slug.is_empty() && patch.title.is_some() {
            next.slug = slugify(&next.title);
        }

        next
    }

    /// Build the patch for a drag-and-drop move of the image at `from` to
    /// position `to`.
    pub fn move_image(&self, from: usize, to: usize) -> Result<ListingPatch, CoreError> {
        let len = self.images.len();
        for index in [from, to] {
            if index >= len {
                return Err(CoreError::ImageIndexOutOfRange { index, len });
            }
        }

        let mut images = self.images.clone();
        let image = images.remove(from);
        images.insert(to, image);

        Ok(ListingPatch::new().images(images))
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// A partial update. `None` leaves the field untouched.
///
/// `price` is doubly optional: `Some(None)` clears the price, which in JSON
/// is written as `"price": null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ListingImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl ListingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the patch touches no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject values no draft may ever hold, before the patch is merged.
    pub fn check(&self) -> Result<(), CoreError> {
        if let Some(Some(price)) = self.price {
            if !price.is_finite() {
                return Err(CoreError::Validation(format!(
                    "price must be a finite number, got {price}"
                )));
            }
        }
        Ok(())
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn property_type(mut self, property_type: impl Into<String>) -> Self {
        self.property_type = Some(property_type.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn price(mut self, price: Option<f64>) -> Self {
        self.price = Some(price);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn images(mut self, images: Vec<ListingImage>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }
}

/// Maps a present field (including an explicit `null`) to `Some(..)`.
/// Absent fields fall back to the container default, `None`.
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
