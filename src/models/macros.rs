//! Macros for declaring models in code
//!
//! [`model!`](crate::model) builds the same [`ModelConfig`](crate::config::ModelConfig)
//! a YAML file would produce, so code-declared and file-declared models can
//! be mixed freely.

/// Declare a model
///
/// Each field is `name: type`, where `type` is a scalar keyword (`string`,
/// `number`, `integer`, `boolean`, `date`, `any`) or the name of another
/// model. Optional attributes go in brackets: `required`,
/// `default = <json>`, `inverse = "<segment>"`.
///
/// # Example
/// ```rust
/// use modelrest::model;
///
/// let book = model!(Book {
///     title: string [required],
///     pages: integer [default = 0],
///     author: Author,
///     editor: Author [inverse = "edited"],
/// });
///
/// assert_eq!(book.name, "Book");
/// assert_eq!(book.fields.len(), 4);
/// assert!(book.fields[0].required);
/// assert_eq!(book.fields[3].inverse.as_deref(), Some("edited"));
/// ```
#[macro_export]
macro_rules! model {
    (@attrs $field:expr; ) => {
        $field
    };
    (@attrs $field:expr; required $(, $($rest:tt)*)?) => {
        $crate::model!(@attrs $field.required(); $($($rest)*)?)
    };
    (@attrs $field:expr; default = $value:expr $(, $($rest:tt)*)?) => {
        $crate::model!(@attrs $field.with_default($crate::__serde_json::json!($value)); $($($rest)*)?)
    };
    (@attrs $field:expr; inverse = $inverse:literal $(, $($rest:tt)*)?) => {
        $crate::model!(@attrs $field.with_inverse($inverse); $($($rest)*)?)
    };
    ($name:ident { $($field:ident : $ty:ident $([ $($attr:tt)* ])?),* $(,)? }) => {{
        let model = $crate::config::ModelConfig::new(stringify!($name));
        $(
            let field = $crate::config::FieldConfig::new(stringify!($field), stringify!($ty));
            $( let field = $crate::model!(@attrs field; $($attr)*); )?
            let model = model.field(field);
        )*
        model
    }};
}

/// Declare several models at once, in order
///
/// # Example
/// ```rust
/// use modelrest::models;
///
/// let declared = models! {
///     Author { name: string },
///     Book { title: string, author: Author },
/// };
/// assert_eq!(declared.len(), 2);
/// ```
#[macro_export]
macro_rules! models {
    ($($name:ident { $($body:tt)* }),* $(,)?) => {
        vec![$($crate::model!($name { $($body)* })),*]
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn test_model_macro_builds_config() {
        let author = model!(Author { name: string });
        assert_eq!(author.name, "Author");
        assert_eq!(author.fields[0].name, "name");
        assert_eq!(author.fields[0].field_type, "string");
        assert!(!author.fields[0].required);
    }

    #[test]
    fn test_field_attributes() {
        let book = model!(Book {
            title: string [required],
            rating: number [default = 2.5, required],
            tags: any [default = ["new"]],
            editor: Author [inverse = "edited"],
        });

        assert!(book.fields[0].required);
        assert_eq!(book.fields[1].default, Some(json!(2.5)));
        assert!(book.fields[1].required);
        assert_eq!(book.fields[2].default, Some(json!(["new"])));
        assert_eq!(book.fields[3].field_type, "Author");
        assert_eq!(book.fields[3].inverse.as_deref(), Some("edited"));
    }

    #[test]
    fn test_empty_model() {
        let tag = model!(Tag {});
        assert!(tag.fields.is_empty());
    }

    #[test]
    fn test_models_macro_keeps_order() {
        let declared = models! {
            Author { name: string },
            Book { title: string, author: Author },
        };
        let names: Vec<_> = declared.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Author", "Book"]);
    }
}
