//! Delimited feed input types.
//!
//! A feed file is delimiter-separated text whose first line names the
//! columns. [`FeedSchema`] maps the well-known column names to positions so
//! the parse stage can index fields without re-reading the header, and
//! [`split_delimited`] splits one line honoring double-quoted fields (the
//! attribute and image-list columns routinely contain the delimiter).

use crate::error::{Error, Result};

/// One raw data line from a feed, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file (the header is line 1).
    pub line_number: usize,
    pub raw: String,
}

impl RawRow {
    pub fn new<S: Into<String>>(line_number: usize, raw: S) -> Self {
        Self {
            line_number,
            raw: raw.into(),
        }
    }
}

/// Column positions resolved from a feed header line.
///
/// The business key and name columns are required; everything else is
/// optional and defaults to empty when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSchema {
    pub id: usize,
    pub name: usize,
    pub description: Option<usize>,
    pub brand: Option<usize>,
    pub category: Option<usize>,
    pub images: Option<usize>,
    pub attributes: Option<usize>,
}

impl FeedSchema {
    /// Resolve column positions from the header line.
    ///
    /// Column matching is case-insensitive and accepts the aliases the
    /// usual retail exports use (`pid`/`sku`/`uniq_id` for the business
    /// key, `product_name` for the name, and so on). Unknown columns are
    /// ignored.
    pub fn from_header(header: &str, delimiter: char) -> Result<Self> {
        let mut id = None;
        let mut name = None;
        let mut description = None;
        let mut brand = None;
        let mut category = None;
        let mut images = None;
        let mut attributes = None;

        for (idx, column) in split_delimited(header, delimiter).iter().enumerate() {
            match column.trim().to_ascii_lowercase().as_str() {
                "pid" | "sku" | "id" | "uniq_id" => id.get_or_insert(idx),
                "product_name" | "name" | "title" => name.get_or_insert(idx),
                "description" | "long_description" => description.get_or_insert(idx),
                "brand" => brand.get_or_insert(idx),
                "product_category_tree" | "category" | "categories" => {
                    category.get_or_insert(idx)
                }
                "image" | "images" | "image_url" => images.get_or_insert(idx),
                "product_specifications" | "attributes" => attributes.get_or_insert(idx),
                _ => continue,
            };
        }

        let id = id.ok_or_else(|| {
            Error::validation(format!("feed header has no business key column: {header}"))
        })?;
        let name = name.ok_or_else(|| {
            Error::validation(format!("feed header has no name column: {header}"))
        })?;

        Ok(Self {
            id,
            name,
            description,
            brand,
            category,
            images,
            attributes,
        })
    }
}

/// Split one line on `delimiter`, honoring double-quoted fields.
///
/// Inside quotes the delimiter is literal and `""` is an escaped quote.
/// Fields are trimmed of surrounding whitespace; a trailing delimiter
/// yields a trailing empty field.
pub fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_fields() {
        assert_eq!(
            split_delimited("1,Shirt,BrandA", ','),
            vec!["1", "Shirt", "BrandA"]
        );
    }

    #[test]
    fn test_split_keeps_empty_fields() {
        assert_eq!(
            split_delimited("2,,desc,BrandB,", ','),
            vec!["2", "", "desc", "BrandB", ""]
        );
    }

    #[test]
    fn test_split_quoted_delimiter() {
        assert_eq!(
            split_delimited(r#"3,"red, striped",Acme"#, ','),
            vec!["3", "red, striped", "Acme"]
        );
    }

    #[test]
    fn test_split_escaped_quote() {
        assert_eq!(
            split_delimited(r#"4,"say ""hi""",x"#, ','),
            vec!["4", r#"say "hi""#, "x"]
        );
    }

    #[test]
    fn test_split_alternate_delimiter() {
        assert_eq!(split_delimited("a\tb\tc", '\t'), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_schema_from_flipkart_header() {
        let header = "uniq_id,product_name,product_category_tree,retail_price,image,description,product_specifications,brand";
        let schema = FeedSchema::from_header(header, ',').unwrap();
        assert_eq!(schema.id, 0);
        assert_eq!(schema.name, 1);
        assert_eq!(schema.category, Some(2));
        assert_eq!(schema.images, Some(4));
        assert_eq!(schema.description, Some(5));
        assert_eq!(schema.attributes, Some(6));
        assert_eq!(schema.brand, Some(7));
    }

    #[test]
    fn test_schema_accepts_aliases() {
        let schema = FeedSchema::from_header("SKU,Name,Brand,Images", ',').unwrap();
        assert_eq!(schema.id, 0);
        assert_eq!(schema.name, 1);
        assert_eq!(schema.brand, Some(2));
        assert_eq!(schema.images, Some(3));
        assert_eq!(schema.description, None);
    }

    #[test]
    fn test_schema_requires_business_key() {
        let err = FeedSchema::from_header("name,brand", ',').unwrap_err();
        assert!(err.to_string().contains("business key"));
    }

    #[test]
    fn test_schema_requires_name() {
        let err = FeedSchema::from_header("pid,brand", ',').unwrap_err();
        assert!(err.to_string().contains("name column"));
    }

    #[test]
    fn test_raw_row_constructor() {
        let row = RawRow::new(2, "1,Shirt");
        assert_eq!(row.line_number, 2);
        assert_eq!(row.raw, "1,Shirt");
    }
}
