//! 引用列表渲染
//!
//! 读取引擎输出目录中的 `url_to_info.json`，按引用编号渲染为 markdown 并附加到文章末尾。
//! 引用只是锦上添花：读取或解析失败只记录日志，文章照常返回。

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::engine::URL_TO_INFO_FILE;

/// 每条引用最多展示的片段数
pub const MAX_SNIPPETS: usize = 3;

/// 单个 URL 的信息
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UrlInfo {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub snippets: Vec<String>,
}

// `"snippets": null` 与缺省同样视为空列表
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// 引用数据：URL 信息（保持文件中的顺序）与 URL 到引用编号的映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationsData {
    pub url_to_info: Vec<(String, UrlInfo)>,
    pub url_to_unified_index: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RawCitations {
    url_to_info: serde_json::Map<String, Value>,
    #[serde(default)]
    url_to_unified_index: HashMap<String, Value>,
}

impl CitationsData {
    /// 解析 `url_to_info.json` 的内容
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawCitations =
            serde_json::from_str(content).context("Failed to parse citations json")?;

        let mut url_to_info = Vec::with_capacity(raw.url_to_info.len());
        for (url, info) in raw.url_to_info {
            let info: UrlInfo = serde_json::from_value(info)
                .with_context(|| format!("Invalid citation entry for {}", url))?;
            url_to_info.push((url, info));
        }

        Ok(Self {
            url_to_info,
            url_to_unified_index: raw.url_to_unified_index,
        })
    }

    /// 读取并解析引用文件
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read citations file: {:?}", path))?;
        Self::from_json(&content)
    }

    /// URL 的引用编号，缺失或无法解析时为 0；浮点编号向零截断
    pub fn citation_number(&self, url: &str) -> i64 {
        match self.url_to_unified_index.get(url) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

/// 渲染引用列表 markdown
pub fn render_citations(data: &CitationsData) -> String {
    let mut citations_markdown = String::from("## Citations\n\n");

    let mut citations: Vec<(i64, &str, &UrlInfo)> = data
        .url_to_info
        .iter()
        .map(|(url, info)| (data.citation_number(url), url.as_str(), info))
        .collect();
    // 稳定排序，编号相同时保持文件顺序
    citations.sort_by_key(|(number, _, _)| *number);

    for (number, url, info) in citations {
        let title = info.title.as_deref().unwrap_or("Untitled");
        let description = info
            .description
            .as_deref()
            .unwrap_or("No description available");

        citations_markdown.push_str(&format!("### [{}] [{}]({})\n\n", number, title, url));
        citations_markdown.push_str(&format!("{}\n\n", description));
        if !info.snippets.is_empty() {
            citations_markdown.push_str("**Relevant Snippets:**\n\n");
            for snippet in info.snippets.iter().take(MAX_SNIPPETS) {
                citations_markdown.push_str(&format!("- {}\n\n", snippet));
            }
        }
        citations_markdown.push_str("---\n\n");
    }

    citations_markdown
}

/// 若文章目录中存在引用文件，则将渲染结果以空行分隔附加到文章末尾
pub fn append_citations(article: String, article_dir: &Path) -> String {
    let citations_path = article_dir.join(URL_TO_INFO_FILE);
    if !citations_path.exists() {
        debug!("Citations file not found: {}", citations_path.display());
        return article;
    }

    match CitationsData::from_file(&citations_path) {
        Ok(data) => format!("{}\n\n{}", article, render_citations(&data)),
        Err(e) => {
            warn!("⚠️ 读取引用文件失败，忽略引用列表: {:#}", e);
            article
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
