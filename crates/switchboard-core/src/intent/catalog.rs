//! Example phrases per category, loaded once at startup

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::Category;
use crate::error::{Error, Result};

/// Labeled example phrases for every routable category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentCatalog {
    examples: BTreeMap<Category, Vec<String>>,
}

impl IntentCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Default catalog for a monitor-mount shop's customer service
    pub fn builtin() -> Self {
        Self::new()
            .with_examples(
                Category::OrderQuery,
                ["我想查詢訂單狀態", "我要查詢訂單", "我的訂單什麼時候會到", "幫我查一下物流進度", "訂單編號查詢"],
            )
            .with_examples(
                Category::ProductRecommendation,
                ["推薦適合的螢幕支架", "有適合32吋螢幕的螢幕臂嗎", "哪一款壁掛支架比較好", "我想買雙螢幕支架"],
            )
            .with_examples(
                Category::TechnicalSupport,
                ["螢幕臂要怎麼安裝", "支架鬆掉了怎麼辦", "VESA孔位不合怎麼處理", "安裝說明書在哪裡"],
            )
            .with_examples(
                Category::PolicyInformation,
                ["我想要退貨", "保固期限多久", "發票可以開三聯式嗎", "退換貨政策是什麼"],
            )
            .with_examples(
                Category::PaymentShipping,
                ["請問有什麼優惠活動", "可以貨到付款嗎", "運費怎麼計算", "支援哪些付款方式"],
            )
            .with_examples(
                Category::HumanEscalation,
                ["我要找真人客服", "轉接人工服務", "我要客訴"],
            )
            .with_examples(
                Category::InventoryManagement,
                ["這個商品還有庫存嗎", "什麼時候會補貨", "我想查詢庫存"],
            )
    }

    /// Append example phrases for a category
    pub fn with_examples<I, S>(mut self, category: Category, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples
            .entry(category)
            .or_default()
            .extend(phrases.into_iter().map(Into::into));
        self
    }

    /// Parse a JSON object of `{"<agent name>": ["phrase", ...]}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;

        let mut catalog = Self::new();
        for (name, phrases) in raw {
            let category: Category = name.parse().map_err(|_| {
                Error::ConfigError(format!("Unknown agent '{}' in intentions catalog", name))
            })?;
            catalog = catalog.with_examples(category, phrases);
        }
        Ok(catalog)
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Example phrases for one category (empty if none)
    pub fn examples(&self, category: Category) -> &[String] {
        self.examples
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Categories with their phrases, in priority order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.examples.iter().map(|(c, p)| (*c, p.as_slice()))
    }

    /// Number of categories with at least one entry
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// One line per category, `- <agent>: <phrase>,<phrase>`, for reasoning prompts
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(category, phrases)| format!("- {}: {}", category, phrases.join(",")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
