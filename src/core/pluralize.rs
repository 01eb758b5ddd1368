//! Collection naming for models
//!
//! Collection names are derived with a deliberately naive rule: lower-case the
//! model name and append `s`. Irregular plurals (`person` → `persons`,
//! `category` → `categorys`) are not special-cased; the derived name becomes a
//! URL segment, so it must stay predictable from the model name alone.

/// Utility converting model names into collection names
pub struct Pluralizer;

impl Pluralizer {
    /// Convert a model name into its collection name
    ///
    /// # Examples
    ///
    /// ```
    /// use modelrest::core::pluralize::Pluralizer;
    ///
    /// assert_eq!(Pluralizer::collection_name("Book"), "books");
    /// assert_eq!(Pluralizer::collection_name("Author"), "authors");
    /// assert_eq!(Pluralizer::collection_name("Address"), "addresss");
    /// ```
    pub fn collection_name(model_name: &str) -> String {
        if model_name.is_empty() {
            return String::new();
        }
        format!("{}s", model_name.to_lowercase())
    }
}
