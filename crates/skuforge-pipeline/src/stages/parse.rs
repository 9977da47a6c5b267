//! Raw row -> product record.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use skuforge_core::feed::{split_delimited, FeedSchema, RawRow};
use skuforge_core::{ImageRef, Product, Result};

use crate::outcome::{FailureRecord, Outcome, Snapshot};
use crate::stage::Stage;

/// Parses one delimited feed line into a [`Product`].
///
/// A row fails parsing when the business key or name column is empty, the
/// business key repeats within the run, or the attribute blob is malformed.
/// Duplicate tracking lives for the stage's lifetime, which is one batch
/// run or one stream subscription.
pub struct ParseStage {
    schema: FeedSchema,
    delimiter: char,
    seen: Mutex<HashSet<String>>,
}

impl ParseStage {
    pub fn new(schema: FeedSchema, delimiter: char) -> Self {
        Self {
            schema,
            delimiter,
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn field<'a>(&self, fields: &'a [String], index: Option<usize>) -> &'a str {
        index
            .and_then(|i| fields.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn parse(&self, row: &RawRow) -> std::result::Result<Product, String> {
        let fields = split_delimited(&row.raw, self.delimiter);

        let sku = self.field(&fields, Some(self.schema.id));
        if sku.is_empty() {
            return Err(format!("line {}: missing business key", row.line_number));
        }
        let name = self.field(&fields, Some(self.schema.name));
        if name.is_empty() {
            return Err(format!("line {}: missing product name", row.line_number));
        }
        if !self.seen.lock().insert(sku.to_string()) {
            return Err(format!(
                "line {}: duplicate business key '{sku}'",
                row.line_number
            ));
        }

        let mut product = Product::new(sku, name);
        product.header.description = self.field(&fields, self.schema.description).to_string();

        let brand = self.field(&fields, self.schema.brand);
        if !brand.is_empty() {
            product.header.brand = Some(brand.to_string());
        }

        product.header.categories = parse_category_path(self.field(&fields, self.schema.category));
        product.header.images = parse_image_list(self.field(&fields, self.schema.images));
        product.attributes = parse_attribute_blob(self.field(&fields, self.schema.attributes))
            .map_err(|reason| format!("line {}: {reason}", row.line_number))?;

        Ok(product)
    }
}

#[async_trait]
impl Stage for ParseStage {
    type Input = RawRow;
    type Output = Product;

    fn name(&self) -> &'static str {
        "parse"
    }

    async fn process(&self, row: RawRow) -> Result<Outcome<Product>> {
        match self.parse(&row) {
            Ok(product) => Ok(Outcome::Success(product)),
            Err(reason) => Ok(Outcome::Failure(FailureRecord::new(
                self.name(),
                row.snapshot(),
                reason,
            ))),
        }
    }
}

/// Split a category path on `>>`.
///
/// Retail exports wrap the path in a single-element JSON array
/// (`["A >> B >> C"]`); both the wrapped and the bare form are accepted.
fn parse_category_path(field: &str) -> Vec<String> {
    let field = field.trim();
    if field.is_empty() {
        return Vec::new();
    }

    let path = if field.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(field) {
            Ok(entries) => entries.join(" >> "),
            Err(_) => field.to_string(),
        }
    } else {
        field.to_string()
    };

    path.split(">>")
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Parse the image-list column: a JSON array of URLs or a `|`-separated
/// list.
fn parse_image_list(field: &str) -> Vec<ImageRef> {
    let field = field.trim();
    if field.is_empty() {
        return Vec::new();
    }

    let urls: Vec<String> = if field.starts_with('[') {
        serde_json::from_str::<Vec<String>>(field)
            .unwrap_or_else(|_| field.split('|').map(str::to_string).collect())
    } else {
        field.split('|').map(str::to_string).collect()
    };

    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .map(ImageRef::new)
        .collect()
}

/// Parse the attribute column: a JSON object or `key=value;key=value`
/// pairs. Anything else is a parse failure for the row.
fn parse_attribute_blob(field: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(BTreeMap::new());
    }

    if field.starts_with('{') {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(field)
            .map_err(|e| format!("malformed attribute blob: {e}"))?;
        let mut attributes = BTreeMap::new();
        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            attributes.insert(key, value);
        }
        return Ok(attributes);
    }

    let mut attributes = BTreeMap::new();
    for pair in field.split(';').filter(|p| !p.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("malformed attribute entry '{}'", pair.trim()))?;
        attributes.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> ParseStage {
        let header = "sku,name,description,brand,category,images,attributes";
        ParseStage::new(FeedSchema::from_header(header, ',').unwrap(), ',')
    }

    fn row(raw: &str) -> RawRow {
        RawRow::new(2, raw)
    }

    #[tokio::test]
    async fn test_parses_full_row() {
        let outcome = stage()
            .process(row(
                r#"SKU-1,Denim Jacket,Classic blue,Acme,"Clothing >> Jackets",http://img/1.jpg|http://img/2.jpg,color=blue;fit=slim"#,
            ))
            .await
            .unwrap();

        let product = outcome.success().unwrap();
        assert_eq!(product.sku, "SKU-1");
        assert_eq!(product.header.name, "Denim Jacket");
        assert_eq!(product.header.description, "Classic blue");
        assert_eq!(product.header.brand.as_deref(), Some("Acme"));
        assert_eq!(product.header.categories, vec!["Clothing", "Jackets"]);
        assert_eq!(product.header.images.len(), 2);
        assert_eq!(product.header.images[0].origin_url, "http://img/1.jpg");
        assert_eq!(product.attributes["color"], "blue");
        assert_eq!(product.attributes["fit"], "slim");
    }

    #[tokio::test]
    async fn test_minimal_row_defaults_optionals() {
        let outcome = stage().process(row("SKU-2,Plain Shirt,,,,,")).await.unwrap();
        let product = outcome.success().unwrap();
        assert_eq!(product.header.description, "");
        assert!(product.header.brand.is_none());
        assert!(product.header.categories.is_empty());
        assert!(product.header.images.is_empty());
        assert!(product.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_name_fails() {
        let outcome = stage().process(row("2,,desc,BrandB,,,")).await.unwrap();
        match outcome {
            Outcome::Failure(f) => {
                assert_eq!(f.stage, "parse");
                assert_eq!(f.input_snapshot, "2,,desc,BrandB,,,");
                assert!(f.reason.contains("missing product name"), "got: {}", f.reason);
            }
            Outcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_missing_business_key_fails() {
        let outcome = stage().process(row(",Shirt,,,,,")).await.unwrap();
        match outcome {
            Outcome::Failure(f) => assert!(f.reason.contains("missing business key")),
            Outcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_business_key_fails_second_row() {
        let stage = stage();
        assert!(stage
            .process(row("SKU-1,First,,,,,"))
            .await
            .unwrap()
            .is_success());

        let outcome = stage.process(row("SKU-1,Second,,,,,")).await.unwrap();
        match outcome {
            Outcome::Failure(f) => {
                assert!(f.reason.contains("duplicate business key 'SKU-1'"))
            }
            Outcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_malformed_attribute_blob_fails() {
        let outcome = stage()
            .process(row("SKU-3,Shirt,,,,,colour-blue"))
            .await
            .unwrap();
        match outcome {
            Outcome::Failure(f) => {
                assert!(f.reason.contains("malformed attribute entry"), "got: {}", f.reason)
            }
            Outcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_json_attribute_blob() {
        let outcome = stage()
            .process(row(
                r#"SKU-4,Shirt,,,,,"{""color"":""green"",""sleeves"":2,""discontinued"":null}""#,
            ))
            .await
            .unwrap();
        let product = outcome.success().unwrap();
        assert_eq!(product.attributes["color"], "green");
        assert_eq!(product.attributes["sleeves"], "2");
        assert!(!product.attributes.contains_key("discontinued"));
    }

    #[tokio::test]
    async fn test_json_wrapped_category_path() {
        let outcome = stage()
            .process(row(
                r#"SKU-5,Flats,,,"[""Footwear >> Women's Footwear >> Flats""]",,"#,
            ))
            .await
            .unwrap();
        let product = outcome.success().unwrap();
        assert_eq!(
            product.header.categories,
            vec!["Footwear", "Women's Footwear", "Flats"]
        );
    }

    #[tokio::test]
    async fn test_json_image_list() {
        let outcome = stage()
            .process(row(
                r#"SKU-6,Shirt,,,,"[""http://img/a.jpg"",""http://img/b.jpg""]","#,
            ))
            .await
            .unwrap();
        let product = outcome.success().unwrap();
        assert_eq!(product.header.images.len(), 2);
        assert_eq!(product.header.images[1].origin_url, "http://img/b.jpg");
        assert!(product.header.images[0].hosted_url.is_none());
    }
}
